use std::{future, sync::Arc};

use aliri_clock::{Clock, System};
use warden::{
    jwa,
    jwt::{self, Claims},
    Jwk, Jwt, JwtRef,
};

use crate::{
    error,
    issuer::TokenIssuer,
    key_store::{JwksFileLoader, KeyStoreLoader},
    scope::ScopeValidator,
    AuthError, AuthOptions, Authority, Credentials, GenerationOptions, JwtAuthorization,
    KeyResolver, KeyStoreError, Principal, ValidationProfile,
};

#[derive(Debug)]
struct Inner {
    resolver: KeyResolver,
    validator: jwt::CoreValidator,
    scopes: ScopeValidator,
    permissions: JwtAuthorization,
    algorithm: Option<jwa::Algorithm>,
}

/// A JWT authentication provider
///
/// The provider verifies bearer tokens against its keys and validation
/// profile, producing a [`Principal`], and issues new tokens signed with
/// the same keys. Keys are loaded once at construction and never change,
/// so the provider can be cloned cheaply and shared across threads.
///
/// Verification proceeds through a fixed sequence of stages, stopping at
/// the first failure:
///
/// 1. the credentials must be a bearer token;
/// 2. the token must decode into a header, payload, and signature;
/// 3. some configured key must match the declared algorithm and key ID;
/// 4. one of those keys must verify the signature;
/// 5. the claims must satisfy the validation profile.
#[derive(Clone, Debug)]
#[must_use]
pub struct JwtAuth<C = System> {
    inner: Arc<Inner>,
    clock: C,
}

impl JwtAuth {
    /// Constructs a provider, reading any JWKS key store from disk
    ///
    /// Inline keys come before key-store keys when resolving candidates.
    /// A provider without any keys rejects every token.
    ///
    /// # Errors
    ///
    /// Returns an error if the key store cannot be read or is of an
    /// unsupported type.
    pub fn new(options: AuthOptions) -> Result<Self, KeyStoreError> {
        Self::with_loader(options, JwksFileLoader)
    }

    /// Constructs a provider, reading any key store with `loader`
    ///
    /// # Errors
    ///
    /// Returns any error raised by the loader.
    pub fn with_loader<L: KeyStoreLoader>(
        options: AuthOptions,
        loader: L,
    ) -> Result<Self, KeyStoreError> {
        let (inline, key_store, profile, claim_key, algorithm) = options.into_parts();

        let mut keys = inline;
        if let Some(key_store) = &key_store {
            keys.extend(loader.load(key_store)?.keys().iter().cloned());
        }

        Self::from_parts(KeyResolver::new(keys), &profile, claim_key, algorithm)
    }

    /// Constructs a provider, reading any JWKS key store asynchronously
    ///
    /// # Errors
    ///
    /// Returns an error if the key store cannot be read or is of an
    /// unsupported type.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub async fn load(options: AuthOptions) -> Result<Self, KeyStoreError> {
        let (inline, key_store, profile, claim_key, algorithm) = options.into_parts();

        let mut keys = inline;
        if let Some(key_store) = &key_store {
            let stored = JwksFileLoader.load_async(key_store).await?;
            keys.extend(stored.keys().iter().cloned());
        }

        Self::from_parts(KeyResolver::new(keys), &profile, claim_key, algorithm)
    }

    /// Constructs a provider with keys fetched from a remote JWKS endpoint
    ///
    /// The remote keys follow any inline keys. A configured key store is
    /// not read.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set cannot be fetched or parsed.
    #[cfg(feature = "reqwest")]
    #[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
    pub async fn from_jwks_url(
        jwks_url: &str,
        options: AuthOptions,
    ) -> Result<Self, KeyStoreError> {
        fn remote(err: reqwest::Error) -> KeyStoreError {
            KeyStoreError::Remote(Box::new(err))
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("warden_auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(remote)?;

        let response = client.get(jwks_url).send().await.map_err(remote)?;
        response.error_for_status_ref().map_err(remote)?;
        let fetched = response.json::<warden::Jwks>().await.map_err(remote)?;

        tracing::info!(jwks.url = %jwks_url, keys.count = fetched.len(), "JWKS fetched");

        let (mut keys, _, profile, claim_key, algorithm) = options.into_parts();
        keys.extend(fetched.keys().iter().cloned());

        Self::from_parts(KeyResolver::new(keys), &profile, claim_key, algorithm)
    }

    /// Constructs a provider that trusts unsigned tokens
    ///
    /// The provider holds no keys. It accepts only tokens using the `none`
    /// algorithm with an empty signature, still subject to `profile`, and
    /// issues only such tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile's required subject cannot be
    /// matched against tokens.
    pub fn unsecured(profile: ValidationProfile) -> Result<Self, KeyStoreError> {
        tracing::warn!("unsecured provider created; unsigned tokens will be trusted");

        Self::from_parts(
            KeyResolver::unsecured(),
            &profile,
            "permissions".to_owned(),
            Some(jwa::Algorithm::None),
        )
    }

    fn from_parts(
        resolver: KeyResolver,
        profile: &ValidationProfile,
        claim_key: String,
        algorithm: Option<jwa::Algorithm>,
    ) -> Result<Self, KeyStoreError> {
        let validator = profile.core_validator()?;

        if !resolver.is_unsecured() {
            if resolver.keys().is_empty() {
                tracing::warn!("no keys configured; every token will be rejected");
            } else {
                tracing::info!(keys.count = resolver.keys().len(), "keys loaded");
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                resolver,
                validator,
                scopes: profile.scope_validator(),
                permissions: JwtAuthorization::new(claim_key),
                algorithm,
            }),
            clock: System,
        })
    }
}

impl<C: Clock> JwtAuth<C> {
    /// Reads the current time from `clock` rather than the system clock
    pub fn with_clock<D: Clock>(self, clock: D) -> JwtAuth<D> {
        JwtAuth {
            inner: self.inner,
            clock,
        }
    }

    /// The provider's keys
    pub fn resolver(&self) -> &KeyResolver {
        &self.inner.resolver
    }

    /// The source of the authorizations cached on every principal
    pub fn permissions(&self) -> &JwtAuthorization {
        &self.inner.permissions
    }

    /// Authenticates credentials
    ///
    /// Only bearer tokens are accepted; other credentials fail with
    /// [`AuthError::CredentialShape`] without any decoding. The principal
    /// produced arrives with the configured permissions claim already
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns the reason the credentials were rejected.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match credentials {
            Credentials::Token { token } => self.authenticate_token(token),
            Credentials::UsernamePassword { .. } => {
                tracing::debug!("credentials are not a bearer token");
                Err(AuthError::CredentialShape)
            }
        }
    }

    /// Authenticates a bearer token
    ///
    /// # Errors
    ///
    /// Returns the reason the token was rejected.
    pub fn authenticate_token(&self, token: &JwtRef) -> Result<Principal, AuthError> {
        let decomposed = token.decompose().map_err(|err| {
            tracing::debug!(error = %err, segment = ?err.segment(), "malformed token");
            AuthError::from(err)
        })?;

        let alg = decomposed.header().alg();
        let kid = decomposed.header().kid().map(ToOwned::to_owned);

        self.verify_signature(&decomposed)?;

        let validated = decomposed
            .validate(&self.inner.validator, &self.inner.scopes, &self.clock)
            .map_err(|err| {
                let err = AuthError::from(err);
                tracing::debug!(%alg, kid = ?kid, reason = %err, "token claims rejected");
                err
            })?;

        let (header, claims) = validated.into_parts();
        let mut principal = Principal::new(claims, header.alg());
        self.inner.permissions.get_authorizations(&mut principal);

        tracing::debug!(%alg, kid = ?kid, "token authenticated");
        Ok(principal)
    }

    fn verify_signature(&self, decomposed: &jwt::Decomposed<'_>) -> Result<(), AuthError> {
        let alg = decomposed.header().alg();
        let kid = decomposed.header().kid();
        let resolver = &self.inner.resolver;

        if resolver.is_unsecured() {
            if !alg.is_unsecured() {
                tracing::debug!(%alg, kid = ?kid, "unsecured provider holds no keys");
                return Err(error::no_matching_key(alg, kid));
            }

            return decomposed.verify_signature(&jwa::Unsecured).map_err(|err| {
                tracing::debug!(%alg, error = %err, "unsigned token carries a signature");
                AuthError::SignatureInvalid
            });
        }

        if alg.is_unsecured() {
            tracing::debug!(%alg, kid = ?kid, "unsigned token rejected");
            return Err(AuthError::SignatureInvalid);
        }

        for key in resolver.resolve(alg, kid)? {
            match decomposed.verify_signature(key) {
                Ok(()) => return Ok(()),
                Err(err) => tracing::trace!(
                    %alg,
                    key.kid = ?key.key_id(),
                    error = %err,
                    "candidate key rejected signature"
                ),
            }
        }

        tracing::debug!(%alg, kid = ?kid, "no candidate key verified signature");
        Err(AuthError::SignatureInvalid)
    }

    /// Issues a signed token
    ///
    /// The clock is read once. See [`issuer::merge_claims()`][crate::issuer::merge_claims]
    /// for how `payload` and `options` combine.
    ///
    /// # Errors
    ///
    /// Returns an error if no single key can sign with the selected
    /// algorithm, or if signing fails.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn generate_token(
        &self,
        payload: &Claims,
        options: &GenerationOptions,
    ) -> Result<Jwt, AuthError> {
        TokenIssuer::new(&self.inner.resolver, self.inner.algorithm).issue(
            payload,
            options,
            self.clock.now(),
        )
    }

    /// The keys able to verify a signature made with `alg`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoMatchingKey`] if there are none.
    pub fn keys_for(
        &self,
        alg: jwa::Algorithm,
        kid: Option<&warden::jwk::KeyIdRef>,
    ) -> Result<Vec<&Jwk>, AuthError> {
        self.inner.resolver.resolve(alg, kid)
    }
}

impl<'a, C> Authority<'a> for JwtAuth<C>
where
    C: Clock + 'a,
{
    type Credentials = Credentials;
    type Principal = Principal;
    type VerifyFuture = future::Ready<Result<Principal, AuthError>>;
    type VerifyError = AuthError;

    fn verify(&'a self, credentials: &'a Credentials) -> Self::VerifyFuture {
        future::ready(self.authenticate(credentials))
    }
}

#[cfg(test)]
mod tests {
    use aliri_clock::{TestClock, UnixTime};
    use color_eyre::Result;
    use tracing_test::traced_test;

    use super::*;

    fn provider() -> Result<JwtAuth<TestClock>> {
        let options = AuthOptions::default().add_key(Jwk::from(jwa::Hmac::from_passphrase("secret")));
        Ok(JwtAuth::new(options)?.with_clock(TestClock::new(UnixTime(1_000))))
    }

    #[test]
    fn is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<JwtAuth>();
        assert_send_sync::<JwtAuth<TestClock>>();
    }

    #[test]
    #[traced_test]
    fn logs_key_count() -> Result<()> {
        let _auth = provider()?;
        assert!(logs_contain("keys loaded"));
        assert!(logs_contain("keys.count=1"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn username_password_is_rejected_by_shape() -> Result<()> {
        let err = provider()?
            .authenticate(&Credentials::username_password("paulo", "hunter2"))
            .unwrap_err();
        assert!(err.is_credential_shape());
        assert!(!logs_contain("hunter2"));
        Ok(())
    }

    #[test]
    fn round_trips() -> Result<()> {
        let auth = provider()?;
        let token = auth.generate_token(
            &Claims::new().with_subject("Paulo"),
            &GenerationOptions::default().expires_in_seconds(10),
        )?;

        let principal = auth.authenticate(&Credentials::token(token))?;
        assert_eq!(principal.claims().get_str("sub"), Some("Paulo"));
        assert_eq!(principal.claims().iat(), Some(UnixTime(1_000)));
        assert_eq!(principal.claims().exp(), Some(UnixTime(1_010)));
        assert!(principal.cached_authorizations("permissions").is_some());

        Ok(())
    }

    #[test]
    fn keyless_provider_rejects_everything() -> Result<()> {
        let issuer = provider()?;
        let token = issuer.generate_token(&Claims::new(), &GenerationOptions::default())?;

        let keyless = JwtAuth::new(AuthOptions::default())?;
        let err = keyless
            .authenticate(&Credentials::token(token))
            .unwrap_err();
        assert!(matches!(err, AuthError::NoMatchingKey { .. }));

        let unsigned = JwtAuth::unsecured(ValidationProfile::default())?
            .generate_token(&Claims::new(), &GenerationOptions::default())?;
        let err = keyless
            .authenticate(&Credentials::token(unsigned))
            .unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));

        Ok(())
    }

    #[tokio::test]
    async fn verifies_as_an_authority() -> Result<()> {
        let auth = provider()?;
        let token = auth.generate_token(&Claims::new(), &GenerationOptions::default())?;

        let credentials = Credentials::token(token);
        let principal = Authority::verify(&auth, &credentials).await?;
        assert_eq!(principal.attribute("alg"), Some(&serde_json::json!("HS256")));

        let bad = Credentials::username_password("a", "b");
        assert!(Authority::verify(&auth, &bad).await.is_err());

        Ok(())
    }
}
