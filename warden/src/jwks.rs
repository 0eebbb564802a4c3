use std::fmt;

use serde::{
    de::{SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    jwa::Algorithm,
    jwk::{KeyIdRef, KeyOperation},
    Jwk,
};

/// A JSON Web Key Set
///
/// Keys that cannot be understood (unknown key types, unsupported curves,
/// algorithms that do not fit the key) are skipped rather than failing the
/// whole set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "usable_keys")]
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the end of the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// The keys, in set order
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// The number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys able to verify a token signed with `alg`, in set order
    ///
    /// When `kid` is given, only keys declaring that same identifier are
    /// candidates. Keys pinned to another `alg`, or whose `use` or
    /// `key_ops` forbid verification, never are.
    pub fn candidates<'a: 'k, 'k>(
        &'a self,
        kid: Option<&'k KeyIdRef>,
        alg: Algorithm,
    ) -> impl Iterator<Item = &'a Jwk> + 'k {
        self.keys.iter().filter(move |k| {
            kid.map_or(true, |kid| k.key_id() == Some(kid))
                && k.is_compatible(alg)
                && k.allows_algorithm(alg)
                && k.permits(KeyOperation::Verify)
        })
    }

    /// Reads a bare JSON array of keys, skipping the unusable ones
    ///
    /// For `#[serde(deserialize_with)]` where a set is written inline as a
    /// list rather than wrapped in `{"keys": [...]}`.
    ///
    /// # Errors
    ///
    /// The input is not an array.
    pub fn from_key_array<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            keys: usable_keys(deserializer)?,
        })
    }

    /// Writes the keys as a bare JSON array
    ///
    /// # Errors
    ///
    /// The serializer failed.
    pub fn serialize_key_array<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keys.serialize(serializer)
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<T: IntoIterator<Item = Jwk>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<Jwk> for Jwks {
    fn extend<T: IntoIterator<Item = Jwk>>(&mut self, iter: T) {
        self.keys.extend(iter);
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry {
    Usable(Jwk),
    Unusable(Summary),
}

/// What is worth reporting about a skipped key
#[derive(Deserialize)]
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
struct Summary {
    #[serde(default)]
    kid: Option<serde_json::Value>,
    #[serde(default)]
    kty: Option<serde_json::Value>,
    #[serde(default)]
    alg: Option<serde_json::Value>,
}

#[cfg(feature = "tracing")]
fn report_skipped(position: usize, key: &Summary) {
    tracing::warn!(
        jwks.position = position,
        jwk.kid = ?key.kid,
        jwk.kty = ?key.kty,
        jwk.alg = ?key.alg,
        "skipping unusable JWK"
    );
}

#[cfg(not(feature = "tracing"))]
fn report_skipped(_: usize, _: &Summary) {}

fn usable_keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Jwk>, D::Error> {
    struct UsableKeys;

    impl<'de> Visitor<'de> for UsableKeys {
        type Value = Vec<Jwk>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of JWK objects")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut keys = Vec::with_capacity(seq.size_hint().unwrap_or_default());
            let mut position = 0_usize;

            while let Some(entry) = seq.next_element()? {
                match entry {
                    Entry::Usable(jwk) => keys.push(jwk),
                    Entry::Unusable(summary) => report_skipped(position, &summary),
                }
                position += 1;
            }

            Ok(keys)
        }
    }

    deserializer.deserialize_seq(UsableKeys)
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    #[cfg(feature = "tracing")]
    use tracing_test::traced_test;

    use super::*;
    use crate::{jwa, jwk::KeyId, test};

    const WITH_UNUSABLE: &str = r#"[
        { "kid": "1", "use": "enc", "alg": "RSA-OAEP" },
        { "kid": "2", "kty": "EC", "crv": "P-521", "x": "AA", "y": "AA" },
        { "kid": "4", "kty": "OKP", "crv": "Ed25519", "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo" },
        { "kty": "oct", "k": "c2VjcmV0", "alg": ["HS256"] },
        { "kid": 7, "kty": "oct", "k": "" },
        {},
        { "kid": "3", "kty": "oct", "k": "c2VjcmV0" }
    ]"#;

    #[test]
    #[cfg_attr(feature = "tracing", traced_test)]
    fn skips_keys_it_cannot_use() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(&format!(r#"{{"keys":{WITH_UNUSABLE}}}"#))?;

        assert_eq!(jwks.len(), 1);
        assert_eq!(jwks.keys()[0].key_id(), Some(KeyIdRef::from_str("3")));

        #[cfg(feature = "tracing")]
        assert!(logs_contain("skipping unusable JWK"));
        Ok(())
    }

    #[test]
    fn bare_arrays_skip_the_same_keys() -> Result<()> {
        let mut de = serde_json::Deserializer::from_str(WITH_UNUSABLE);
        let jwks = Jwks::from_key_array(&mut de)?;
        assert_eq!(jwks.len(), 1);

        let mut out = Vec::new();
        jwks.serialize_key_array(&mut serde_json::Serializer::new(&mut out))?;
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&out)?,
            serde_json::json!([{ "kid": "3", "kty": "oct", "k": "c2VjcmV0" }])
        );
        Ok(())
    }

    #[test]
    fn set_must_be_a_list() {
        assert!(serde_json::from_str::<Jwks>(r#"{"keys":{}}"#).is_err());
    }

    #[test]
    fn decodes_mixed_set() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::mixed::JWKS)?;
        assert_eq!(jwks.len(), 3);
        Ok(())
    }

    #[test]
    fn key_id_match_is_strict() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::mixed::JWKS)?;

        let hs = jwks
            .candidates(Some(KeyIdRef::from_str("hmac")), Algorithm::HS256)
            .next();
        assert!(hs.is_some());

        let wrong = jwks
            .candidates(Some(KeyIdRef::from_str("other")), Algorithm::HS256)
            .next();
        assert!(wrong.is_none());

        let any = jwks.candidates(None, Algorithm::HS256).next();
        assert_eq!(any, hs);
        Ok(())
    }

    #[test]
    fn candidates_respect_declared_algorithm_and_family() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(test::mixed::JWKS)?;

        assert_eq!(jwks.candidates(None, Algorithm::HS256).count(), 1);
        assert_eq!(jwks.candidates(None, Algorithm::HS512).count(), 0);
        assert_eq!(jwks.candidates(None, Algorithm::RS256).count(), 1);
        assert_eq!(jwks.candidates(None, Algorithm::ES256).count(), 0);
        assert_eq!(jwks.candidates(None, Algorithm::None).count(), 0);
        Ok(())
    }

    #[test]
    fn candidates_keep_set_order() {
        let jwks: Jwks = ["a", "b", "c"]
            .into_iter()
            .map(|kid| Jwk::from(jwa::Hmac::from_passphrase(kid)).with_key_id(KeyId::from(kid)))
            .collect();

        let order: Vec<_> = jwks
            .candidates(None, Algorithm::HS384)
            .filter_map(Jwk::key_id)
            .map(KeyIdRef::as_str)
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
    }
}
