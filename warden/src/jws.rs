//! JSON Web Signature ([RFC7515][]) capabilities
//!
//! A key family implements [`Signer`] and [`Verifier`] for the algorithms
//! of its [`Family`][crate::jwa::Family] and reports
//! [`Incompatible`][crate::error::VerifyError::Incompatible] for every
//! other algorithm. [`Jwk`][crate::Jwk] picks the family implementation by
//! key type and adds the `use`, `key_ops` and `alg` restrictions.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use crate::{
    error::{SignError, VerifyError},
    jwa::Algorithm,
};

/// Produces signatures over a JWS signing input
pub trait Signer {
    /// Whether a signature can be produced with `alg`
    fn can_sign(&self, alg: Algorithm) -> bool;

    /// Signs `data` with `alg`
    ///
    /// # Errors
    ///
    /// Returns an error if this signer cannot sign with `alg`.
    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError>;
}

/// Checks signatures over a JWS signing input
pub trait Verifier {
    /// Whether signatures made with `alg` can be checked
    fn can_verify(&self, alg: Algorithm) -> bool;

    /// Checks that `signature` was made over `data` with `alg`
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not match or this verifier
    /// cannot check `alg`.
    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), VerifyError>;
}

impl<T: Signer + ?Sized> Signer for &'_ T {
    #[inline]
    fn can_sign(&self, alg: Algorithm) -> bool {
        T::can_sign(self, alg)
    }

    #[inline]
    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError> {
        T::sign(self, alg, data)
    }
}

impl<T: Verifier + ?Sized> Verifier for &'_ T {
    #[inline]
    fn can_verify(&self, alg: Algorithm) -> bool {
        T::can_verify(self, alg)
    }

    #[inline]
    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        T::verify(self, alg, data, signature)
    }
}
