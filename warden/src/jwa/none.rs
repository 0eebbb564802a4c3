use crate::{
    error::{SignError, VerifyError},
    jwa::Algorithm,
    jws,
};

/// Signs and verifies with `none`
///
/// Signing yields an empty signature, and only an empty signature
/// verifies. This is never selected from a token header: callers opt in by
/// passing it explicitly, and no [`Jwk`][crate::Jwk] accepts `none`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unsecured;

impl jws::Signer for Unsecured {
    fn can_sign(&self, alg: Algorithm) -> bool {
        alg.is_unsecured()
    }

    fn sign(&self, alg: Algorithm, _data: &[u8]) -> Result<Vec<u8>, SignError> {
        if alg.is_unsecured() {
            Ok(Vec::new())
        } else {
            Err(SignError::Incompatible(alg))
        }
    }
}

impl jws::Verifier for Unsecured {
    fn can_verify(&self, alg: Algorithm) -> bool {
        alg.is_unsecured()
    }

    fn verify(&self, alg: Algorithm, _data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        match (alg.is_unsecured(), signature.is_empty()) {
            (false, _) => Err(VerifyError::Incompatible(alg)),
            (true, false) => Err(VerifyError::Mismatch),
            (true, true) => Ok(()),
        }
    }
}
