//! RSA signatures: PKCS#1 v1.5 (`RS*`) and PSS (`PS*`)
//!
//! A public key is its modulus `n` and exponent `e`. A JWK that carries
//! the private exponent `d` must also carry `p`, `q`, `dp`, `dq` and `qi`.
//! Serialization emits `n` and `e` only.

use std::{fmt, sync::Arc};

use aliri_base64::{Base64Url, Base64UrlRef};
use ring::{
    rand::SystemRandom,
    rsa::{KeyPairComponents, PublicKeyComponents},
    signature::{self, RsaEncoding, RsaKeyPair, RsaParameters},
};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error::{KeyError, SignError, VerifyError},
    jwa::Algorithm,
    jws,
};

const MODULUS_BITS: std::ops::RangeInclusive<usize> = 2048..=8192;

/// An RSA public key, with its private half when known
#[derive(Clone, Deserialize)]
#[serde(try_from = "RsaMembers")]
#[must_use]
pub struct Rsa {
    n: Base64Url,
    e: Base64Url,
    key_pair: Option<Arc<RsaKeyPair>>,
}

fn params(alg: Algorithm) -> Option<(&'static RsaParameters, &'static dyn RsaEncoding)> {
    let pair: (&'static RsaParameters, &'static dyn RsaEncoding) = match alg {
        Algorithm::RS256 => (
            &signature::RSA_PKCS1_2048_8192_SHA256,
            &signature::RSA_PKCS1_SHA256,
        ),
        Algorithm::RS384 => (
            &signature::RSA_PKCS1_2048_8192_SHA384,
            &signature::RSA_PKCS1_SHA384,
        ),
        Algorithm::RS512 => (
            &signature::RSA_PKCS1_2048_8192_SHA512,
            &signature::RSA_PKCS1_SHA512,
        ),
        Algorithm::PS256 => (
            &signature::RSA_PSS_2048_8192_SHA256,
            &signature::RSA_PSS_SHA256,
        ),
        Algorithm::PS384 => (
            &signature::RSA_PSS_2048_8192_SHA384,
            &signature::RSA_PSS_SHA384,
        ),
        Algorithm::PS512 => (
            &signature::RSA_PSS_2048_8192_SHA512,
            &signature::RSA_PSS_SHA512,
        ),
        _ => return None,
    };
    Some(pair)
}

impl Rsa {
    /// A public key from its modulus and exponent, big-endian
    ///
    /// # Errors
    ///
    /// The modulus must be 2048 to 8192 bits and the exponent non-zero.
    pub fn from_public_components(
        n: impl Into<Base64Url>,
        e: impl Into<Base64Url>,
    ) -> Result<Self, KeyError> {
        let (n, e) = (n.into(), e.into());

        if !MODULUS_BITS.contains(&bit_length(n.as_slice())) {
            return Err(KeyError::Invalid("RSA modulus must be 2048 to 8192 bits"));
        }
        if bit_length(e.as_slice()) == 0 {
            return Err(KeyError::Invalid("RSA exponent is zero"));
        }

        Ok(Self {
            n,
            e,
            key_pair: None,
        })
    }

    /// Generates a 2048-bit key pair
    ///
    /// # Errors
    ///
    /// The backend failed to produce a key.
    #[cfg(feature = "openssl")]
    #[cfg_attr(docsrs, doc(cfg(feature = "openssl")))]
    pub fn generate() -> Result<Self, KeyError> {
        let key = openssl::rsa::Rsa::generate(2048)?;
        Self::from_openssl(&key)
    }

    /// Reads a PEM document holding either a private key (PKCS#1 or
    /// PKCS#8) or a public key (SPKI)
    ///
    /// # Errors
    ///
    /// The document holds neither.
    #[cfg(feature = "openssl")]
    #[cfg_attr(docsrs, doc(cfg(feature = "openssl")))]
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        if let Ok(private) = openssl::rsa::Rsa::private_key_from_pem(pem.as_bytes()) {
            return Self::from_openssl(&private);
        }

        let public = openssl::rsa::Rsa::public_key_from_pem(pem.as_bytes())?;
        Self::from_public_components(public.n().to_vec(), public.e().to_vec())
    }

    #[cfg(feature = "openssl")]
    fn from_openssl(key: &openssl::rsa::Rsa<openssl::pkey::Private>) -> Result<Self, KeyError> {
        let public = Self::from_public_components(key.n().to_vec(), key.e().to_vec())?;
        let der = key.private_key_to_der()?;
        let key_pair = RsaKeyPair::from_der(&der).map_err(|e| KeyError::Rejected(e.to_string()))?;

        Ok(Self {
            key_pair: Some(Arc::new(key_pair)),
            ..public
        })
    }

    /// The modulus
    pub fn modulus(&self) -> &Base64UrlRef {
        &self.n
    }

    /// The public exponent
    pub fn exponent(&self) -> &Base64UrlRef {
        &self.e
    }

    /// Whether the private half is held
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.key_pair.is_some()
    }

    /// Drops the private half
    pub fn public_only(self) -> Self {
        Self {
            key_pair: None,
            ..self
        }
    }
}

fn bit_length(be_bytes: &[u8]) -> usize {
    match be_bytes.iter().position(|&b| b != 0) {
        Some(i) => (be_bytes.len() - i) * 8 - be_bytes[i].leading_zeros() as usize,
        None => 0,
    }
}

impl PartialEq for Rsa {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n && self.e == other.e && self.has_private_key() == other.has_private_key()
    }
}

impl Eq for Rsa {}

impl fmt::Debug for Rsa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rsa")
            .field("bits", &bit_length(self.n.as_slice()))
            .field("private", &self.has_private_key())
            .finish()
    }
}

#[derive(Deserialize)]
struct RsaMembers {
    n: Base64Url,
    e: Base64Url,
    d: Option<Base64Url>,
    p: Option<Base64Url>,
    q: Option<Base64Url>,
    dp: Option<Base64Url>,
    dq: Option<Base64Url>,
    qi: Option<Base64Url>,
}

impl TryFrom<RsaMembers> for Rsa {
    type Error = KeyError;

    fn try_from(m: RsaMembers) -> Result<Self, Self::Error> {
        let public = Self::from_public_components(m.n, m.e)?;
        let Some(d) = m.d else {
            return Ok(public);
        };

        let (Some(p), Some(q), Some(dp), Some(dq), Some(qi)) = (m.p, m.q, m.dp, m.dq, m.qi) else {
            return Err(KeyError::Invalid(
                "RSA private key needs p, q, dp, dq and qi alongside d",
            ));
        };

        let components = KeyPairComponents {
            public_key: PublicKeyComponents {
                n: public.n.as_slice(),
                e: public.e.as_slice(),
            },
            d: d.as_slice(),
            p: p.as_slice(),
            q: q.as_slice(),
            dP: dp.as_slice(),
            dQ: dq.as_slice(),
            qInv: qi.as_slice(),
        };
        let key_pair = RsaKeyPair::from_components(&components)
            .map_err(|e| KeyError::Rejected(e.to_string()))?;

        Ok(Self {
            key_pair: Some(Arc::new(key_pair)),
            ..public
        })
    }
}

impl Serialize for Rsa {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct PublicMembers<'a> {
            n: &'a Base64UrlRef,
            e: &'a Base64UrlRef,
        }

        PublicMembers {
            n: &self.n,
            e: &self.e,
        }
        .serialize(serializer)
    }
}

impl jws::Signer for Rsa {
    fn can_sign(&self, alg: Algorithm) -> bool {
        self.key_pair.is_some() && params(alg).is_some()
    }

    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError> {
        let (_, padding) = params(alg).ok_or(SignError::Incompatible(alg))?;
        let key_pair = self.key_pair.as_ref().ok_or(SignError::MissingPrivateKey)?;

        let mut sig = vec![0; key_pair.public().modulus_len()];
        key_pair
            .sign(padding, &SystemRandom::new(), data, &mut sig)
            .map_err(|_| SignError::Crypto)?;
        Ok(sig)
    }
}

impl jws::Verifier for Rsa {
    fn can_verify(&self, alg: Algorithm) -> bool {
        params(alg).is_some()
    }

    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        let (params, _) = params(alg).ok_or(VerifyError::Incompatible(alg))?;
        let public = signature::RsaPublicKeyComponents {
            n: self.n.as_slice(),
            e: self.e.as_slice(),
        };
        public
            .verify(params, data, signature)
            .map_err(|_| VerifyError::Mismatch)
    }
}
