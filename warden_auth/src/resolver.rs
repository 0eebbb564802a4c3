use warden::{
    jwa,
    jwk::KeyIdRef,
    jws::Signer,
    Jwk, Jwks,
};

use crate::{error, AuthError};

/// Maps an algorithm and optional key ID to the keys able to handle them
///
/// The key set is fixed at construction. Keys are considered in the order
/// they were registered, and several keys may serve the same algorithm.
///
/// A resolver built with [`KeyResolver::unsecured()`] holds no keys and is
/// the only one that trusts the `none` algorithm. No key held by any other
/// resolver is ever compatible with `none`.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct KeyResolver {
    keys: Jwks,
    unsecured: bool,
}

impl KeyResolver {
    /// A resolver over `keys`
    pub fn new(keys: Jwks) -> Self {
        Self {
            keys,
            unsecured: false,
        }
    }

    /// A resolver that holds no keys and trusts unsigned tokens
    pub fn unsecured() -> Self {
        Self {
            keys: Jwks::default(),
            unsecured: true,
        }
    }

    /// Whether this resolver trusts unsigned tokens
    #[must_use]
    pub fn is_unsecured(&self) -> bool {
        self.unsecured
    }

    /// The registered keys
    #[must_use]
    pub fn keys(&self) -> &Jwks {
        &self.keys
    }

    /// Keys able to verify a signature made with `alg`, in registration order
    ///
    /// When `kid` is given, only keys declaring that identifier qualify.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoMatchingKey`] if no key qualifies.
    pub fn resolve(
        &self,
        alg: jwa::Algorithm,
        kid: Option<&KeyIdRef>,
    ) -> Result<Vec<&Jwk>, AuthError> {
        let candidates: Vec<_> = self.keys.candidates(kid, alg).collect();

        if candidates.is_empty() {
            tracing::debug!(%alg, kid = ?kid, "no key matches token");
            return Err(error::no_matching_key(alg, kid));
        }

        Ok(candidates)
    }

    /// The single key able to sign with `alg`
    ///
    /// When several keys could sign, `kid` must pick one of them.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoMatchingKey`] if no key can sign, or
    /// [`AuthError::AmbiguousSigningKey`] if more than one can.
    pub fn signing_key(
        &self,
        alg: jwa::Algorithm,
        kid: Option<&KeyIdRef>,
    ) -> Result<&Jwk, AuthError> {
        let mut candidates = self.keys.keys().iter().filter(|k| {
            let kid_matches = match kid {
                Some(kid) => k.key_id() == Some(kid),
                None => true,
            };

            kid_matches && k.can_sign(alg)
        });

        match (candidates.next(), candidates.next()) {
            (Some(key), None) => Ok(key),
            (None, _) => {
                tracing::debug!(%alg, kid = ?kid, "no key can sign");
                Err(error::no_matching_key(alg, kid))
            }
            (Some(_), Some(_)) => {
                tracing::debug!(%alg, kid = ?kid, "several keys can sign");
                Err(AuthError::AmbiguousSigningKey { alg })
            }
        }
    }
}
