//! ECDSA on P-256 (`ES256`) and P-384 (`ES384`)
//!
//! Signatures are the fixed-width concatenation `r || s`. A key's curve
//! decides the one algorithm it serves.

use std::{fmt, sync::Arc};

use aliri_base64::{Base64Url, Base64UrlRef};
use ring::{
    rand::SystemRandom,
    signature::{self, EcdsaKeyPair, EcdsaSigningAlgorithm, EcdsaVerificationAlgorithm, KeyPair},
};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error::{KeyError, SignError, VerifyError},
    jwa::{Algorithm, Family},
    jws,
};

const UNCOMPRESSED: u8 = 0x04;

/// A named curve (`crv`)
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Curve {
    /// NIST P-256
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384
    #[serde(rename = "P-384")]
    P384,
}

impl Curve {
    /// Width in bytes of a coordinate or private scalar
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }

    /// The algorithm keys on this curve sign with
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
        }
    }

    fn signing(self) -> &'static EcdsaSigningAlgorithm {
        match self {
            Self::P256 => &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            Self::P384 => &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
        }
    }

    fn verification(self) -> &'static EcdsaVerificationAlgorithm {
        match self {
            Self::P256 => &signature::ECDSA_P256_SHA256_FIXED,
            Self::P384 => &signature::ECDSA_P384_SHA384_FIXED,
        }
    }
}

/// An elliptic curve public key, with its private scalar when known
#[derive(Clone, Deserialize)]
#[serde(try_from = "EcMembers")]
#[must_use]
pub struct EllipticCurve {
    crv: Curve,
    x: Base64Url,
    y: Base64Url,
    key_pair: Option<Arc<EcdsaKeyPair>>,
}

impl EllipticCurve {
    /// A public key from its affine coordinates
    ///
    /// # Errors
    ///
    /// Each coordinate must be exactly [`Curve::coordinate_len`] bytes.
    pub fn from_coordinates(
        crv: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, KeyError> {
        let (x, y) = (x.into(), y.into());
        let len = crv.coordinate_len();
        if x.as_slice().len() != len || y.as_slice().len() != len {
            return Err(KeyError::Invalid("EC coordinate has the wrong width"));
        }

        Ok(Self {
            crv,
            x,
            y,
            key_pair: None,
        })
    }

    /// Generates a key pair on `crv`
    ///
    /// # Errors
    ///
    /// The system random source failed.
    pub fn generate(crv: Curve) -> Result<Self, KeyError> {
        let rng = SystemRandom::new();
        let pkcs8 =
            EcdsaKeyPair::generate_pkcs8(crv.signing(), &rng).map_err(|_| KeyError::Generation)?;
        Self::from_pkcs8(crv, pkcs8.as_ref())
    }

    /// Reads a PKCS#8 document holding a key pair on `crv`
    ///
    /// # Errors
    ///
    /// The document holds no key pair on that curve.
    pub fn from_pkcs8(crv: Curve, der: &[u8]) -> Result<Self, KeyError> {
        let key_pair = EcdsaKeyPair::from_pkcs8(crv.signing(), der, &SystemRandom::new())
            .map_err(|e| KeyError::Rejected(e.to_string()))?;

        let len = crv.coordinate_len();
        let (x, y) = match key_pair.public_key().as_ref().split_first() {
            Some((&UNCOMPRESSED, xy)) if xy.len() == 2 * len => xy.split_at(len),
            _ => return Err(KeyError::Invalid("EC public point is not uncompressed")),
        };

        let public = Self::from_coordinates(crv, x, y)?;
        Ok(Self {
            key_pair: Some(Arc::new(key_pair)),
            ..public
        })
    }

    /// Reads a PEM-encoded P-256 or P-384 private key
    ///
    /// # Errors
    ///
    /// The document holds no private key on a supported curve.
    #[cfg(feature = "openssl")]
    #[cfg_attr(docsrs, doc(cfg(feature = "openssl")))]
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        use openssl::{nid::Nid, pkey::PKey};

        let pkey = PKey::private_key_from_pem(pem.as_bytes())?;
        let crv = match pkey.ec_key()?.group().curve_name() {
            Some(Nid::X9_62_PRIME256V1) => Curve::P256,
            Some(Nid::SECP384R1) => Curve::P384,
            _ => return Err(KeyError::Invalid("unsupported elliptic curve")),
        };

        Self::from_pkcs8(crv, &pkey.private_key_to_pkcs8()?)
    }

    /// The curve
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.crv
    }

    /// The x coordinate
    pub fn x(&self) -> &Base64UrlRef {
        &self.x
    }

    /// The y coordinate
    pub fn y(&self) -> &Base64UrlRef {
        &self.y
    }

    /// Whether the private scalar is held
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.key_pair.is_some()
    }

    /// Drops the private scalar
    pub fn public_only(self) -> Self {
        Self {
            key_pair: None,
            ..self
        }
    }

    fn point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + 2 * self.crv.coordinate_len());
        point.push(UNCOMPRESSED);
        point.extend_from_slice(self.x.as_slice());
        point.extend_from_slice(self.y.as_slice());
        point
    }

    fn serves(&self, alg: Algorithm) -> bool {
        alg.family() == Family::EllipticCurve(self.crv)
    }
}

impl PartialEq for EllipticCurve {
    fn eq(&self, other: &Self) -> bool {
        self.crv == other.crv
            && self.x == other.x
            && self.y == other.y
            && self.has_private_key() == other.has_private_key()
    }
}

impl Eq for EllipticCurve {}

impl fmt::Debug for EllipticCurve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EllipticCurve")
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("private", &self.has_private_key())
            .finish()
    }
}

#[derive(Deserialize)]
struct EcMembers {
    crv: Curve,
    x: Base64Url,
    y: Base64Url,
    d: Option<Base64Url>,
}

impl TryFrom<EcMembers> for EllipticCurve {
    type Error = KeyError;

    fn try_from(m: EcMembers) -> Result<Self, Self::Error> {
        let public = Self::from_coordinates(m.crv, m.x, m.y)?;
        let Some(d) = m.d else {
            return Ok(public);
        };

        if d.as_slice().len() != public.crv.coordinate_len() {
            return Err(KeyError::Invalid("EC private scalar has the wrong width"));
        }

        let key_pair = EcdsaKeyPair::from_private_key_and_public_key(
            public.crv.signing(),
            d.as_slice(),
            &public.point(),
            &SystemRandom::new(),
        )
        .map_err(|e| KeyError::Rejected(e.to_string()))?;

        Ok(Self {
            key_pair: Some(Arc::new(key_pair)),
            ..public
        })
    }
}

impl Serialize for EllipticCurve {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct PublicMembers<'a> {
            crv: Curve,
            x: &'a Base64UrlRef,
            y: &'a Base64UrlRef,
        }

        PublicMembers {
            crv: self.crv,
            x: &self.x,
            y: &self.y,
        }
        .serialize(serializer)
    }
}

impl jws::Signer for EllipticCurve {
    fn can_sign(&self, alg: Algorithm) -> bool {
        self.key_pair.is_some() && self.serves(alg)
    }

    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError> {
        if !self.serves(alg) {
            return Err(SignError::Incompatible(alg));
        }
        let key_pair = self.key_pair.as_ref().ok_or(SignError::MissingPrivateKey)?;

        let sig = key_pair
            .sign(&SystemRandom::new(), data)
            .map_err(|_| SignError::Crypto)?;
        Ok(sig.as_ref().to_vec())
    }
}

impl jws::Verifier for EllipticCurve {
    fn can_verify(&self, alg: Algorithm) -> bool {
        self.serves(alg)
    }

    fn verify(&self, alg: Algorithm, data: &[u8], sig: &[u8]) -> Result<(), VerifyError> {
        if !self.serves(alg) {
            return Err(VerifyError::Incompatible(alg));
        }

        signature::UnparsedPublicKey::new(self.crv.verification(), self.point())
            .verify(data, sig)
            .map_err(|_| VerifyError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jws::{Signer, Verifier},
        test,
    };

    #[test]
    fn private_scalar_matches_public_point() -> color_eyre::Result<()> {
        let key: EllipticCurve = serde_json::from_str(test::ec::PRIVATE_JWK)?;
        assert!(key.has_private_key());

        let sig = key.sign(Algorithm::ES256, b"header.payload")?;
        assert_eq!(sig.len(), 64);

        let public = key.public_only();
        public.verify(Algorithm::ES256, b"header.payload", &sig)?;
        assert_eq!(
            public.verify(Algorithm::ES256, b"header.payloaD", &sig),
            Err(VerifyError::Mismatch)
        );
        Ok(())
    }

    #[test]
    fn scalar_for_another_point_is_rejected() {
        let jwk = r#"{
            "crv": "P-256",
            "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y": "4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM",
            "d": "WeS-QXoPDuYn2pBaKbJwPxGNeVDXcjALbSGqmTo63Ck"
        }"#;
        assert!(serde_json::from_str::<EllipticCurve>(jwk).is_err());
    }

    #[test]
    fn generated_key_serializes_public_point_only() -> color_eyre::Result<()> {
        let key = EllipticCurve::generate(Curve::P384)?;
        let sig = key.sign(Algorithm::ES384, b"data")?;
        assert_eq!(sig.len(), 96);

        let json = serde_json::to_value(&key)?;
        assert!(json.get("d").is_none());
        assert_eq!(json["crv"], "P-384");

        let public: EllipticCurve = serde_json::from_value(json)?;
        assert_eq!(public, key.clone().public_only());
        public.verify(Algorithm::ES384, b"data", &sig)?;
        Ok(())
    }

    #[test]
    fn curve_decides_the_algorithm() -> color_eyre::Result<()> {
        let key = EllipticCurve::generate(Curve::P384)?;
        assert!(key.can_sign(Curve::P384.algorithm()));
        assert!(!key.can_sign(Algorithm::ES256));
        assert!(!key.can_verify(Algorithm::RS256));
        assert_eq!(
            key.sign(Algorithm::ES256, b"data"),
            Err(SignError::Incompatible(Algorithm::ES256))
        );
        Ok(())
    }

    #[cfg(feature = "openssl")]
    #[test]
    fn reads_sec1_pem() -> color_eyre::Result<()> {
        use openssl::{ec::EcGroup, ec::EcKey, nid::Nid};

        let group = EcGroup::from_curve_name(Nid::SECP384R1)?;
        let pem = EcKey::generate(&group)?.private_key_to_pem()?;

        let key = EllipticCurve::from_pem(std::str::from_utf8(&pem)?)?;
        assert_eq!(key.curve(), Curve::P384);
        assert!(key.can_sign(Algorithm::ES384));
        Ok(())
    }

    #[test]
    fn coordinates_must_fill_the_curve() {
        assert!(EllipticCurve::from_coordinates(Curve::P256, vec![1; 31], vec![1; 32]).is_err());
        let jwk = r#"{"crv":"P-521","x":"AA","y":"AA"}"#;
        assert!(serde_json::from_str::<EllipticCurve>(jwk).is_err());
    }
}
