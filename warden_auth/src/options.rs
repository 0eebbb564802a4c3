use serde::{Deserialize, Serialize};
use warden::{
    error::SubjectError,
    jwa,
    jwk::{KeyId, KeyIdRef},
    jwt::{Audience, CoreValidator, Issuer, IssuerRef, Subject, SubjectRef},
    Jwk, Jwks,
};

use crate::{key_store::KeyStoreOptions, scope::ScopeValidator, Permission, Scope};

const DEFAULT_SCOPE_DELIMITER: &str = " ";
const DEFAULT_PERMISSIONS_CLAIM: &str = "permissions";

/// Configuration of a [`JwtAuth`][crate::JwtAuth] provider
///
/// Keys may be given inline (`jwks`), through a key store (`keyStore`), or
/// both; inline keys come first when resolving candidates. Inline keys
/// that cannot be used (unknown key types or curves, or an `alg` the key
/// cannot serve) are skipped with a warning.
///
/// ```
/// use warden_auth::AuthOptions;
///
/// # fn main() -> Result<(), serde_json::Error> {
/// let options: AuthOptions = serde_json::from_str(r#"{
///     "jwks": [{ "kty": "oct", "k": "c2VjcmV0", "alg": "HS256" }],
///     "jwtOptions": { "issuer": "authority", "leeway": 5 },
///     "permissionsClaimKey": "realm_access/roles"
/// }"#)?;
///
/// assert_eq!(options.jwks().len(), 1);
/// assert_eq!(options.permissions_claim_key(), "realm_access/roles");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[must_use]
pub struct AuthOptions {
    #[serde(
        deserialize_with = "Jwks::from_key_array",
        serialize_with = "Jwks::serialize_key_array",
        skip_serializing_if = "Jwks::is_empty"
    )]
    jwks: Jwks,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_store: Option<KeyStoreOptions>,
    jwt_options: ValidationProfile,
    permissions_claim_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            jwks: Jwks::default(),
            key_store: None,
            jwt_options: ValidationProfile::default(),
            permissions_claim_key: DEFAULT_PERMISSIONS_CLAIM.to_owned(),
            algorithm: None,
        }
    }
}

impl AuthOptions {
    /// Registers an inline key
    pub fn add_key(mut self, key: Jwk) -> Self {
        self.jwks.add_key(key);
        self
    }

    /// Registers several inline keys
    pub fn extend_keys<I: IntoIterator<Item = Jwk>>(mut self, keys: I) -> Self {
        self.jwks.extend(keys);
        self
    }

    /// Loads additional keys from a key store
    pub fn with_key_store(self, key_store: KeyStoreOptions) -> Self {
        Self {
            key_store: Some(key_store),
            ..self
        }
    }

    /// Sets the profile tokens are validated against
    pub fn with_jwt_options(self, jwt_options: ValidationProfile) -> Self {
        Self {
            jwt_options,
            ..self
        }
    }

    /// Sets the claim from which permissions are read on authentication
    pub fn with_permissions_claim_key(self, key: impl Into<String>) -> Self {
        Self {
            permissions_claim_key: key.into(),
            ..self
        }
    }

    /// Sets the default signing algorithm for issued tokens
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            ..self
        }
    }

    /// Inline keys
    #[must_use]
    pub fn jwks(&self) -> &Jwks {
        &self.jwks
    }

    /// Key store, if configured
    #[must_use]
    pub fn key_store(&self) -> Option<&KeyStoreOptions> {
        self.key_store.as_ref()
    }

    /// Validation profile
    pub fn jwt_options(&self) -> &ValidationProfile {
        &self.jwt_options
    }

    /// Claim read for permissions
    #[must_use]
    pub fn permissions_claim_key(&self) -> &str {
        &self.permissions_claim_key
    }

    /// Default signing algorithm
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Jwks,
        Option<KeyStoreOptions>,
        ValidationProfile,
        String,
        Option<jwa::Algorithm>,
    ) {
        (
            self.jwks,
            self.key_store,
            self.jwt_options,
            self.permissions_claim_key,
            self.algorithm,
        )
    }
}

/// The checks applied to the claims of every token
///
/// All checks are off by default except expiration, which is enforced
/// with no leeway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[must_use]
pub struct ValidationProfile {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    algorithms: Vec<jwa::Algorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<Issuer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    audience: Vec<Audience>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scopes: Vec<Scope>,
    scope_delimiter: String,
    leeway: u64,
    ignore_expiration: bool,
}

impl Default for ValidationProfile {
    fn default() -> Self {
        Self {
            algorithms: Vec::new(),
            subject: None,
            issuer: None,
            audience: Vec::new(),
            scopes: Vec::new(),
            scope_delimiter: DEFAULT_SCOPE_DELIMITER.to_owned(),
            leeway: 0,
            ignore_expiration: false,
        }
    }
}

impl ValidationProfile {
    /// Accepts tokens signed with `alg`
    ///
    /// Once any algorithm is listed, tokens using an unlisted one are
    /// rejected.
    pub fn add_algorithm(mut self, alg: jwa::Algorithm) -> Self {
        self.algorithms.push(alg);
        self
    }

    /// Requires the `sub` claim to equal `subject` exactly
    pub fn with_subject(self, subject: impl Into<Subject>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..self
        }
    }

    /// Requires the `iss` claim to equal `issuer`
    pub fn with_issuer(self, issuer: impl Into<Issuer>) -> Self {
        Self {
            issuer: Some(issuer.into()),
            ..self
        }
    }

    /// Accepts tokens intended for `audience`
    pub fn add_audience(mut self, audience: impl Into<Audience>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Requires the `scope` claim to grant `scope`
    pub fn add_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Sets the delimiter separating scopes in the `scope` claim
    pub fn with_scope_delimiter(self, delimiter: impl Into<String>) -> Self {
        Self {
            scope_delimiter: delimiter.into(),
            ..self
        }
    }

    /// Tolerates this many seconds of clock drift
    pub fn with_leeway(self, leeway: u64) -> Self {
        Self { leeway, ..self }
    }

    /// Skips (or restores) the expiration check
    pub fn ignore_expiration(self, ignore: bool) -> Self {
        Self {
            ignore_expiration: ignore,
            ..self
        }
    }

    /// Approved algorithms; empty when any is accepted
    #[must_use]
    pub fn algorithms(&self) -> &[jwa::Algorithm] {
        &self.algorithms
    }

    /// Required subject
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_deref()
    }

    /// Required issuer
    #[must_use]
    pub fn issuer(&self) -> Option<&IssuerRef> {
        self.issuer.as_deref()
    }

    /// Accepted audiences
    #[must_use]
    pub fn audience(&self) -> &[Audience] {
        &self.audience
    }

    /// Required scopes
    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Scope delimiter
    #[must_use]
    pub fn scope_delimiter(&self) -> &str {
        &self.scope_delimiter
    }

    /// Leeway in seconds
    #[must_use]
    pub fn leeway(&self) -> u64 {
        self.leeway
    }

    /// Whether expiration is ignored
    #[must_use]
    pub fn ignores_expiration(&self) -> bool {
        self.ignore_expiration
    }

    /// The core validator enforcing this profile's algorithm, time,
    /// issuer, audience, and subject checks
    ///
    /// # Errors
    ///
    /// The required subject cannot be turned into a matcher.
    pub fn core_validator(&self) -> Result<CoreValidator, SubjectError> {
        let mut validator = CoreValidator::default()
            .with_leeway_secs(self.leeway)
            .extend_approved_algorithms(self.algorithms.iter().copied())
            .extend_allowed_audiences(self.audience.iter().cloned());

        if self.ignore_expiration {
            validator = validator.ignore_expiration();
        }

        if let Some(iss) = &self.issuer {
            validator = validator.require_issuer(iss.clone());
        }

        if let Some(sub) = &self.subject {
            validator = validator.require_subject(sub.clone())?;
        }

        Ok(validator)
    }

    /// The validator enforcing this profile's scope requirement
    pub fn scope_validator(&self) -> ScopeValidator {
        ScopeValidator::new(self.scopes.iter().cloned(), self.scope_delimiter.as_str())
    }
}

/// Options applied when issuing a token
///
/// Option-derived claims are merged into the application's payload; see
/// [`issuer::merge_claims()`][crate::issuer::merge_claims].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[must_use]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<Subject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    audience: Vec<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer: Option<Issuer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scopes: Vec<Scope>,
    scope_delimiter: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<Permission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in_seconds: Option<u64>,
    no_timestamp: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            algorithm: None,
            subject: None,
            audience: Vec::new(),
            issuer: None,
            scopes: Vec::new(),
            scope_delimiter: DEFAULT_SCOPE_DELIMITER.to_owned(),
            permissions: Vec::new(),
            expires_in_seconds: None,
            no_timestamp: false,
            key_id: None,
        }
    }
}

impl GenerationOptions {
    /// Signs with `alg` rather than the provider default
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            ..self
        }
    }

    /// Sets the `sub` claim
    pub fn with_subject(self, subject: impl Into<Subject>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..self
        }
    }

    /// Adds an audience to the `aud` claim
    pub fn add_audience(mut self, audience: impl Into<Audience>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Sets the `iss` claim
    pub fn with_issuer(self, issuer: impl Into<Issuer>) -> Self {
        Self {
            issuer: Some(issuer.into()),
            ..self
        }
    }

    /// Adds a scope to the `scope` claim
    pub fn add_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Sets the delimiter used to join scopes
    pub fn with_scope_delimiter(self, delimiter: impl Into<String>) -> Self {
        Self {
            scope_delimiter: delimiter.into(),
            ..self
        }
    }

    /// Adds a permission to the `permissions` claim
    pub fn add_permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Expires the token this many seconds after issuance
    pub fn expires_in_seconds(self, seconds: u64) -> Self {
        Self {
            expires_in_seconds: Some(seconds),
            ..self
        }
    }

    /// Expires the token this many minutes after issuance
    pub fn expires_in_minutes(self, minutes: u64) -> Self {
        self.expires_in_seconds(minutes.saturating_mul(60))
    }

    /// Omits the `iat` claim
    pub fn no_timestamp(self) -> Self {
        Self {
            no_timestamp: true,
            ..self
        }
    }

    /// Chooses among several signing keys by key ID
    pub fn with_key_id(self, kid: impl Into<KeyId>) -> Self {
        Self {
            key_id: Some(kid.into()),
            ..self
        }
    }

    /// Algorithm override
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// Subject
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_deref()
    }

    /// Audiences
    #[must_use]
    pub fn audience(&self) -> &[Audience] {
        &self.audience
    }

    /// Issuer
    #[must_use]
    pub fn issuer(&self) -> Option<&IssuerRef> {
        self.issuer.as_deref()
    }

    /// Scopes
    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Scope delimiter
    #[must_use]
    pub fn scope_delimiter(&self) -> &str {
        &self.scope_delimiter
    }

    /// Permissions
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Lifetime in seconds
    #[must_use]
    pub fn expiry(&self) -> Option<u64> {
        self.expires_in_seconds
    }

    /// Whether `iat` is omitted
    #[must_use]
    pub fn omits_timestamp(&self) -> bool {
        self.no_timestamp
    }

    /// Signing key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }
}
