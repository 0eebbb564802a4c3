//! JSON Web Keys ([RFC7517][])
//!
//! A [`Jwk`] may restrict how it is used through `use`, `key_ops`, and
//! `alg`. All three are honored when signing and verifying. Serializing a
//! JWK never emits private key material for asymmetric keys.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

use crate::{
    error::{KeyError, SignError, VerifyError},
    jwa::{self, Algorithm},
    jws::{Signer, Verifier},
};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to a JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// The intended use of a key (`use`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Usage {
    /// Signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// Encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// An operation a key may be used for (`key_ops`)
///
/// When a JWK lists its operations, only those listed are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum KeyOperation {
    /// Compute a digital signature or MAC
    Sign,
    /// Verify a digital signature or MAC
    Verify,
    /// Encrypt content
    Encrypt,
    /// Decrypt content and validate decryption
    Decrypt,
    /// Encrypt a key
    WrapKey,
    /// Decrypt a key and validate decryption
    UnwrapKey,
    /// Derive a key
    DeriveKey,
    /// Derive bits not to be used as a key
    DeriveBits,
}

impl KeyOperation {
    const fn is_signature(self) -> bool {
        matches!(self, Self::Sign | Self::Verify)
    }
}

/// A JSON Web Key with its optional restrictions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JwkMembers")]
#[must_use]
pub struct Jwk {
    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,

    #[serde(rename = "key_ops", skip_serializing_if = "Option::is_none")]
    operations: Option<Vec<KeyOperation>>,

    #[serde(rename = "alg", skip_serializing_if = "Option::is_none")]
    algorithm: Option<Algorithm>,

    #[serde(flatten)]
    key: Key,
}

#[derive(Deserialize)]
struct JwkMembers {
    #[serde(rename = "kid", default)]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default)]
    usage: Option<Usage>,

    #[serde(rename = "key_ops", default)]
    operations: Option<Vec<KeyOperation>>,

    #[serde(rename = "alg", default)]
    algorithm: Option<Algorithm>,

    #[serde(flatten)]
    key: Key,
}

impl TryFrom<JwkMembers> for Jwk {
    type Error = KeyError;

    fn try_from(m: JwkMembers) -> Result<Self, Self::Error> {
        match m.algorithm {
            Some(alg) if !m.key.is_compatible(alg) => Err(KeyError::AlgorithmMismatch(alg)),
            _ => Ok(Self {
                key_id: m.key_id,
                usage: m.usage,
                operations: m.operations,
                algorithm: m.algorithm,
                key: m.key,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
enum Key {
    #[serde(rename = "RSA")]
    Rsa(jwa::Rsa),

    #[serde(rename = "EC")]
    EllipticCurve(jwa::EllipticCurve),

    #[serde(rename = "oct")]
    Hmac(jwa::Hmac),
}

impl Key {
    fn as_signer(&self) -> &dyn Signer {
        match self {
            Self::Rsa(k) => k,
            Self::EllipticCurve(k) => k,
            Self::Hmac(k) => k,
        }
    }

    fn as_verifier(&self) -> &dyn Verifier {
        match self {
            Self::Rsa(k) => k,
            Self::EllipticCurve(k) => k,
            Self::Hmac(k) => k,
        }
    }

    fn is_compatible(&self, alg: Algorithm) -> bool {
        self.as_verifier().can_verify(alg)
    }

    fn has_private_key(&self) -> bool {
        match self {
            Self::Rsa(k) => k.has_private_key(),
            Self::EllipticCurve(k) => k.has_private_key(),
            Self::Hmac(_) => true,
        }
    }

    fn public_only(self) -> Self {
        match self {
            Self::Rsa(k) => Self::Rsa(k.public_only()),
            Self::EllipticCurve(k) => Self::EllipticCurve(k.public_only()),
            Self::Hmac(_) => self,
        }
    }
}

impl Jwk {
    fn with_key(key: Key) -> Self {
        Self {
            key_id: None,
            usage: None,
            operations: None,
            algorithm: None,
            key,
        }
    }

    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The declared `alg`
    #[must_use]
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// The declared `use`
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// The declared `key_ops`
    #[must_use]
    pub fn operations(&self) -> Option<&[KeyOperation]> {
        self.operations.as_deref()
    }

    /// Whether the key holds private or shared secret material
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.key.has_private_key()
    }

    /// Whether the key material can be used with `alg`
    ///
    /// No key is compatible with `none`.
    #[must_use]
    pub fn is_compatible(&self, alg: Algorithm) -> bool {
        self.key.is_compatible(alg)
    }

    /// Whether `use` and `key_ops` allow `op`
    #[must_use]
    pub fn permits(&self, op: KeyOperation) -> bool {
        let usage_ok = match self.usage {
            Some(usage) => !op.is_signature() || usage == Usage::Signing,
            None => true,
        };

        usage_ok && self.operations.as_ref().map_or(true, |ops| ops.contains(&op))
    }

    /// Whether the declared `alg`, if any, is `alg`
    #[must_use]
    pub fn allows_algorithm(&self, alg: Algorithm) -> bool {
        self.algorithm.map_or(true, |pinned| pinned == alg)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }

    /// Pins the algorithm and marks the key for signatures
    pub fn with_algorithm(self, alg: Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            usage: Some(Usage::Signing),
            ..self
        }
    }

    /// Sets `use`
    pub fn with_usage(self, usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// Restricts the key to the given operations
    pub fn with_operations(self, ops: impl IntoIterator<Item = KeyOperation>) -> Self {
        Self {
            operations: Some(ops.into_iter().collect()),
            ..self
        }
    }

    /// Strips private key material
    pub fn public_only(self) -> Self {
        Self {
            key: self.key.public_only(),
            ..self
        }
    }
}

impl From<jwa::Hmac> for Jwk {
    fn from(key: jwa::Hmac) -> Self {
        Self::with_key(Key::Hmac(key))
    }
}

impl From<jwa::Rsa> for Jwk {
    fn from(key: jwa::Rsa) -> Self {
        Self::with_key(Key::Rsa(key))
    }
}

impl From<jwa::EllipticCurve> for Jwk {
    fn from(key: jwa::EllipticCurve) -> Self {
        Self::with_key(Key::EllipticCurve(key))
    }
}

impl Signer for Jwk {
    fn can_sign(&self, alg: Algorithm) -> bool {
        self.permits(KeyOperation::Sign)
            && self.allows_algorithm(alg)
            && self.key.as_signer().can_sign(alg)
    }

    fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, SignError> {
        if !self.permits(KeyOperation::Sign) {
            return Err(SignError::UsageForbidden);
        }
        if !self.allows_algorithm(alg) {
            return Err(SignError::Incompatible(alg));
        }

        self.key.as_signer().sign(alg, data)
    }
}

impl Verifier for Jwk {
    fn can_verify(&self, alg: Algorithm) -> bool {
        self.permits(KeyOperation::Verify)
            && self.allows_algorithm(alg)
            && self.key.is_compatible(alg)
    }

    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        if !self.permits(KeyOperation::Verify) {
            return Err(VerifyError::UsageForbidden);
        }
        if !self.allows_algorithm(alg) {
            return Err(VerifyError::Incompatible(alg));
        }

        self.key.as_verifier().verify(alg, data, signature)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    mod serialization {
        use super::*;

        #[test]
        fn deserializes_rfc7517_rsa_key() -> Result<()> {
            let key: Jwk = serde_json::from_str(test::rsa::JWK)?;
            assert_eq!(key.key_id(), Some(KeyIdRef::from_str(test::rsa::KEY_ID)));
            assert_eq!(key.algorithm(), Some(Algorithm::RS256));
            assert!(!key.has_private_key());
            Ok(())
        }

        #[test]
        fn deserializes_rfc7517_ec_key() -> Result<()> {
            let key: Jwk = serde_json::from_str(test::ec::JWK)?;
            assert_eq!(key.usage(), Some(Usage::Encryption));
            assert!(key.is_compatible(Algorithm::ES256));
            assert!(!key.is_compatible(Algorithm::ES384));
            assert!(!key.permits(KeyOperation::Verify));
            Ok(())
        }

        #[test]
        fn declared_algorithm_must_fit_the_key() {
            for alg in ["RS256", "ES256", "none"] {
                let jwk = format!(r#"{{"kty":"oct","k":"c2VjcmV0","alg":"{alg}"}}"#);
                assert!(serde_json::from_str::<Jwk>(&jwk).is_err(), "{alg}");
            }
        }

        #[test]
        fn omits_absent_members() -> Result<()> {
            let key = Jwk::from(jwa::Hmac::from_passphrase("secret"));
            assert_eq!(
                serde_json::to_value(&key)?,
                serde_json::json!({ "kty": "oct", "k": "c2VjcmV0" })
            );
            Ok(())
        }

        #[test]
        fn never_emits_private_material() -> Result<()> {
            let key: Jwk = serde_json::from_str(test::rsa::PRIVATE_JWK)?;
            let key = key
                .with_key_id(KeyId::from_static("rsa"))
                .with_algorithm(Algorithm::PS256);
            assert!(key.has_private_key());

            let value = serde_json::to_value(&key)?;
            for member in ["d", "p", "q", "dp", "dq", "qi"] {
                assert!(value.get(member).is_none(), "{member}");
            }
            assert_eq!(value["kid"], "rsa");
            assert_eq!(value["alg"], "PS256");
            assert_eq!(value["use"], "sig");

            let public: Jwk = serde_json::from_value(value)?;
            assert!(!public.has_private_key());
            assert_eq!(public, key.public_only());
            Ok(())
        }

        #[test]
        fn keeps_key_operations() -> Result<()> {
            let jwk = r#"{"kty":"oct","k":"c2VjcmV0","key_ops":["verify","deriveBits"]}"#;
            let key: Jwk = serde_json::from_str(jwk)?;
            assert_eq!(
                key.operations(),
                Some(&[KeyOperation::Verify, KeyOperation::DeriveBits][..])
            );
            assert_eq!(
                serde_json::to_value(&key)?["key_ops"],
                serde_json::json!(["verify", "deriveBits"])
            );
            Ok(())
        }
    }

    mod signing {
        use super::*;

        fn hmac() -> Jwk {
            Jwk::from(jwa::Hmac::from_passphrase("secret"))
        }

        #[test]
        fn unpinned_key_serves_its_whole_family() -> Result<()> {
            let key = hmac();
            for alg in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
                let sig = key.sign(alg, b"data")?;
                key.verify(alg, b"data", &sig)?;
            }
            Ok(())
        }

        #[test]
        fn pinned_algorithm_is_enforced() -> Result<()> {
            let key = hmac().with_algorithm(Algorithm::HS256);
            let sig = key.sign(Algorithm::HS256, b"data")?;

            assert!(!key.can_verify(Algorithm::HS512));
            assert_eq!(
                key.verify(Algorithm::HS512, b"data", &sig),
                Err(VerifyError::Incompatible(Algorithm::HS512))
            );
            assert_eq!(
                key.sign(Algorithm::HS384, b"data"),
                Err(SignError::Incompatible(Algorithm::HS384))
            );
            Ok(())
        }

        #[test]
        fn other_families_are_incompatible() {
            let key = hmac();
            assert!(!key.can_verify(Algorithm::RS256));
            assert_eq!(
                key.verify(Algorithm::ES256, b"data", b"sig"),
                Err(VerifyError::Incompatible(Algorithm::ES256))
            );
        }

        #[test]
        fn none_is_never_served_by_a_key() {
            let key = hmac();
            assert!(!key.can_verify(Algorithm::None));
            assert!(!key.can_sign(Algorithm::None));
            assert!(key.verify(Algorithm::None, b"data", b"").is_err());
        }

        #[test]
        fn encryption_key_cannot_sign_or_verify() {
            let key = hmac().with_usage(Usage::Encryption);
            assert_eq!(
                key.verify(Algorithm::HS256, b"data", b"sig"),
                Err(VerifyError::UsageForbidden)
            );
            assert_eq!(
                key.sign(Algorithm::HS256, b"data"),
                Err(SignError::UsageForbidden)
            );
        }

        #[test]
        fn key_operations_restrict_use() -> Result<()> {
            let signer = hmac().with_operations([KeyOperation::Sign]);
            let verifier = hmac().with_operations([KeyOperation::Verify]);

            let sig = signer.sign(Algorithm::HS256, b"data")?;
            verifier.verify(Algorithm::HS256, b"data", &sig)?;

            assert!(!verifier.can_sign(Algorithm::HS256));
            assert!(!signer.can_verify(Algorithm::HS256));
            assert_eq!(
                signer.verify(Algorithm::HS256, b"data", &sig),
                Err(VerifyError::UsageForbidden)
            );
            Ok(())
        }

        #[test]
        fn public_key_cannot_sign() -> Result<()> {
            let key: Jwk = serde_json::from_str(test::rsa::JWK)?;
            assert!(!key.can_sign(Algorithm::RS256));
            assert!(key.can_verify(Algorithm::RS256));
            assert_eq!(
                key.sign(Algorithm::RS256, b"data"),
                Err(SignError::MissingPrivateKey)
            );
            Ok(())
        }

        #[test]
        fn private_jwks_sign_for_their_family() -> Result<()> {
            let rsa: Jwk = serde_json::from_str(test::rsa::PRIVATE_JWK)?;
            let ec: Jwk = serde_json::from_str(test::ec::PRIVATE_JWK)?;

            let sig = rsa.sign(Algorithm::RS512, b"data")?;
            rsa.clone().public_only().verify(Algorithm::RS512, b"data", &sig)?;
            assert_eq!(
                ec.verify(Algorithm::RS512, b"data", &sig),
                Err(VerifyError::Incompatible(Algorithm::RS512))
            );

            let sig = ec.sign(Algorithm::ES256, b"data")?;
            ec.clone().public_only().verify(Algorithm::ES256, b"data", &sig)?;
            assert!(!rsa.can_verify(Algorithm::ES256));
            Ok(())
        }
    }
}
