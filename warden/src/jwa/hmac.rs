//! HMAC with SHA-2 (`HS256`, `HS384`, `HS512`)
//!
//! The shared secret travels in the `k` member of an `oct` JWK. Any of the
//! three digests may be used with the same secret unless the JWK pins one
//! with `alg`.

use std::fmt;

use aliri_base64::Base64Url;
use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::{
    error::{KeyError, SignError, VerifyError},
    jwa::Algorithm,
    jws,
};

/// A shared HMAC secret
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OctMembers")]
#[must_use]
pub struct Hmac {
    k: Base64Url,
}

#[derive(Deserialize)]
struct OctMembers {
    k: Base64Url,
}

impl TryFrom<OctMembers> for Hmac {
    type Error = KeyError;

    fn try_from(members: OctMembers) -> Result<Self, Self::Error> {
        if members.k.as_slice().is_empty() {
            return Err(KeyError::Invalid("HMAC secret is empty"));
        }

        Ok(Self { k: members.k })
    }
}

impl Hmac {
    /// Uses the given bytes as the secret
    pub fn new(secret: impl Into<Base64Url>) -> Self {
        Self { k: secret.into() }
    }

    /// Uses the UTF-8 bytes of a passphrase as the secret
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::new(passphrase.as_bytes())
    }

    fn key(&self, alg: Algorithm) -> Option<hmac::Key> {
        digest(alg).map(|digest| hmac::Key::new(digest, self.k.as_slice()))
    }
}

fn digest(alg: Algorithm) -> Option<hmac::Algorithm> {
    match alg {
        Algorithm::HS256 => Some(hmac::HMAC_SHA256),
        Algorithm::HS384 => Some(hmac::HMAC_SHA384),
        Algorithm::HS512 => Some(hmac::HMAC_SHA512),
        _ => None,
    }
}

impl fmt::Debug for Hmac {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hmac(<{} byte secret>)", self.k.as_slice().len())
    }
}

impl jws::Signer for Hmac {
    fn can_sign(&self, alg: Algorithm) -> bool {
        digest(alg).is_some()
    }

    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError> {
        let key = self.key(alg).ok_or(SignError::Incompatible(alg))?;
        Ok(hmac::sign(&key, data).as_ref().to_vec())
    }
}

impl jws::Verifier for Hmac {
    fn can_verify(&self, alg: Algorithm) -> bool {
        digest(alg).is_some()
    }

    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        let key = self.key(alg).ok_or(VerifyError::Incompatible(alg))?;
        hmac::verify(&key, data, signature).map_err(|_| VerifyError::Mismatch)
    }
}
