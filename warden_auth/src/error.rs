//! Authentication and configuration errors

use std::{error::Error as StdError, path::PathBuf};

use thiserror::Error;
use warden::{
    error::{ClaimViolation, EncodeError, MalformedToken, SubjectError},
    jwa, jwk,
};

use crate::scope::InsufficientScope;

/// The reason a single authentication or issuance request failed
///
/// None of these errors affect the provider itself, which remains usable
/// for subsequent requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The credentials were not a bearer token
    #[error("credentials are not a bearer token")]
    CredentialShape,

    /// The token could not be decoded into a header, payload, and signature
    #[error("malformed token")]
    MalformedToken(#[from] MalformedToken),

    /// No configured key can handle the algorithm and key ID
    #[error("no key available for algorithm '{alg}'")]
    NoMatchingKey {
        /// The requested algorithm
        alg: jwa::Algorithm,
        /// The requested key ID, if any
        kid: Option<jwk::KeyId>,
    },

    /// The signature did not verify with any candidate key, or the
    /// algorithm is not acceptable
    #[error("invalid token signature")]
    SignatureInvalid,

    /// The token has expired
    #[error("token expired")]
    ClaimExpired,

    /// The token was issued in the future or is not yet valid
    #[error("token not yet valid")]
    ClaimNotYetValid,

    /// The token issuer is missing or not the required issuer
    #[error("issuer mismatch")]
    ClaimIssuerMismatch,

    /// The token audience is missing or shares nothing with the required audiences
    #[error("audience mismatch")]
    ClaimAudienceMismatch,

    /// The token subject is missing or does not match
    #[error("subject mismatch")]
    ClaimSubjectMismatch,

    /// The token does not grant every required scope
    #[error("scope mismatch")]
    ClaimScopeMismatch(#[source] InsufficientScope),

    /// The token was rejected by another claims check
    #[error("token rejected by claims validator")]
    ClaimRejected(#[source] ClaimViolation),

    /// Several keys could sign with the algorithm, and no key ID chose between them
    #[error("more than one key can sign with '{alg}'; a key ID is required")]
    AmbiguousSigningKey {
        /// The requested algorithm
        alg: jwa::Algorithm,
    },

    /// The token could not be signed
    #[error("unable to sign token")]
    Signing(#[from] EncodeError),
}

impl AuthError {
    /// Whether the credentials were rejected for their shape alone
    #[must_use]
    pub fn is_credential_shape(&self) -> bool {
        matches!(self, Self::CredentialShape)
    }

    /// Whether the token failed claims validation
    #[must_use]
    pub fn is_claim_violation(&self) -> bool {
        matches!(
            self,
            Self::ClaimExpired
                | Self::ClaimNotYetValid
                | Self::ClaimIssuerMismatch
                | Self::ClaimAudienceMismatch
                | Self::ClaimSubjectMismatch
                | Self::ClaimScopeMismatch(_)
                | Self::ClaimRejected(_)
        )
    }
}

pub(crate) fn no_matching_key(alg: jwa::Algorithm, kid: Option<&jwk::KeyIdRef>) -> AuthError {
    AuthError::NoMatchingKey {
        alg,
        kid: kid.map(ToOwned::to_owned),
    }
}

impl From<ClaimViolation> for AuthError {
    fn from(err: ClaimViolation) -> Self {
        match err {
            ClaimViolation::Algorithm(_) => Self::SignatureInvalid,
            ClaimViolation::Expired => Self::ClaimExpired,
            ClaimViolation::IssuedInFuture | ClaimViolation::NotYetValid => Self::ClaimNotYetValid,
            ClaimViolation::Issuer | ClaimViolation::Missing("iss") => Self::ClaimIssuerMismatch,
            ClaimViolation::Audience | ClaimViolation::Missing("aud") => {
                Self::ClaimAudienceMismatch
            }
            ClaimViolation::Subject | ClaimViolation::Missing("sub") => Self::ClaimSubjectMismatch,
            ClaimViolation::Custom(inner) => match inner.downcast::<InsufficientScope>() {
                Ok(scope) => Self::ClaimScopeMismatch(*scope),
                Err(other) => Self::ClaimRejected(ClaimViolation::Custom(other)),
            },
            other => Self::ClaimRejected(other),
        }
    }
}

/// An error loading keys while constructing a provider
///
/// These errors are fatal: the provider is never built.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyStoreError {
    /// The key store could not be read
    #[error("unable to read key store at {}", path.display())]
    Io {
        /// Location of the key store
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The key store is not a valid JSON Web Key Set
    #[error("unable to parse key store at {}", path.display())]
    Parse {
        /// Location of the key store
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// No loader understands this key store type
    #[error("unsupported key store type '{0}'")]
    UnsupportedKeyStore(String),

    /// A remote key set could not be fetched
    #[error("unable to fetch remote JWKS")]
    Remote(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The profile's required subject cannot be matched against tokens
    #[error("invalid validation profile")]
    Profile(#[from] SubjectError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_time_rejections() {
        assert!(matches!(
            AuthError::from(ClaimViolation::Expired),
            AuthError::ClaimExpired
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::IssuedInFuture),
            AuthError::ClaimNotYetValid
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::NotYetValid),
            AuthError::ClaimNotYetValid
        ));
    }

    #[test]
    fn missing_claims_map_to_mismatches() {
        assert!(matches!(
            AuthError::from(ClaimViolation::Missing("iss")),
            AuthError::ClaimIssuerMismatch
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::Missing("aud")),
            AuthError::ClaimAudienceMismatch
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::Missing("sub")),
            AuthError::ClaimSubjectMismatch
        ));
    }

    #[test]
    fn disallowed_algorithm_is_a_signature_failure() {
        assert!(matches!(
            AuthError::from(ClaimViolation::Algorithm(jwa::Algorithm::None)),
            AuthError::SignatureInvalid
        ));
    }

    #[test]
    fn mismatches_map_like_missing_claims() {
        assert!(matches!(
            AuthError::from(ClaimViolation::Issuer),
            AuthError::ClaimIssuerMismatch
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::Audience),
            AuthError::ClaimAudienceMismatch
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::Subject),
            AuthError::ClaimSubjectMismatch
        ));
        assert!(matches!(
            AuthError::from(ClaimViolation::Missing("jti")),
            AuthError::ClaimRejected(ClaimViolation::Missing("jti"))
        ));
    }

    #[test]
    fn recovers_scope_rejections() {
        let err = AuthError::from(ClaimViolation::Custom(Box::new(InsufficientScope::Missing)));
        assert!(matches!(
            err,
            AuthError::ClaimScopeMismatch(InsufficientScope::Missing)
        ));
        assert!(err.is_claim_violation());
    }

    #[test]
    fn keeps_unknown_custom_rejections() {
        let err = AuthError::from(ClaimViolation::Custom("nope".into()));
        assert!(matches!(err, AuthError::ClaimRejected(_)));
    }
}
