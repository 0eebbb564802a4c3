//! Failures raised while reading keys, decoding tokens, signing, and
//! validating claims

use std::{error::Error as StdError, fmt};

use thiserror::Error;

use crate::jwa::Algorithm;

/// One of the three `.`-separated parts of a compact token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// The JOSE header
    Header,
    /// The claims
    Payload,
    /// The signature
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Payload => "payload",
            Self::Signature => "signature",
        })
    }
}

/// The text is not a compact JWT this crate can read
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedToken {
    /// The token does not split into exactly three segments
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),

    /// A segment is not unpadded base64url
    #[error("{segment} is not unpadded base64url")]
    Encoding {
        /// The offending segment
        segment: Segment,
        /// The decoding failure
        #[source]
        source: aliri_base64::InvalidBase64Data,
    },

    /// The header or payload is not a JSON object of the expected shape
    #[error("{segment} is not a valid JSON object")]
    Json {
        /// The offending segment
        segment: Segment,
        /// The parse failure
        #[source]
        source: serde_json::Error,
    },

    /// A registered claim holds a value of the wrong JSON type
    #[error("claim `{0}` has the wrong type")]
    ClaimType(&'static str),
}

impl MalformedToken {
    /// The segment at fault, when a single one is
    #[must_use]
    pub fn segment(&self) -> Option<Segment> {
        match self {
            Self::Encoding { segment, .. } | Self::Json { segment, .. } => Some(*segment),
            Self::ClaimType(_) => Some(Segment::Payload),
            Self::SegmentCount(_) => None,
        }
    }
}

/// Key material that cannot be used
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyError {
    /// A member is missing, empty, or out of range
    #[error("{0}")]
    Invalid(&'static str),

    /// The declared `alg` cannot be used with the key type
    #[error("key cannot be used with {0}")]
    AlgorithmMismatch(Algorithm),

    /// The cryptographic backend refused the material
    #[error("key rejected: {0}")]
    Rejected(String),

    /// Fresh key material could not be generated
    #[error("unable to generate key material")]
    Generation,

    /// A PEM document could not be read
    #[cfg(feature = "openssl")]
    #[cfg_attr(docsrs, doc(cfg(feature = "openssl")))]
    #[error("unable to read PEM document")]
    Pem(#[from] openssl::error::ErrorStack),
}

/// A name in an `alg` member that this crate does not implement
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unsupported algorithm `{0}`")]
pub struct UnknownAlgorithm(pub(crate) String);

impl UnknownAlgorithm {
    /// The name as it was given
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A signature could not be produced
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum SignError {
    /// The key cannot produce signatures for this algorithm
    #[error("key cannot sign with {0}")]
    Incompatible(Algorithm),

    /// The key's `use` or `key_ops` forbid signing
    #[error("key usage does not permit signing")]
    UsageForbidden,

    /// Only the public half of the key is held
    #[error("key holds no private material")]
    MissingPrivateKey,

    /// The cryptographic backend failed
    #[error("signature computation failed")]
    Crypto,
}

/// A signature was not accepted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum VerifyError {
    /// The key cannot check signatures for this algorithm
    #[error("key cannot verify {0}")]
    Incompatible(Algorithm),

    /// The key's `use` or `key_ops` forbid verification
    #[error("key usage does not permit verification")]
    UsageForbidden,

    /// The signature does not match the signing input
    #[error("signature mismatch")]
    Mismatch,
}

/// A token could not be assembled
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The header or payload could not be written as JSON
    #[error("unable to serialize {segment}")]
    Serialize {
        /// The segment being written
        segment: Segment,
        /// The serialization failure
        #[source]
        source: serde_json::Error,
    },

    /// The signer refused
    #[error(transparent)]
    Sign(#[from] SignError),
}

/// A claim, or the header algorithm, violates the validation profile
///
/// Variants that come from the core validator are listed in the order the
/// checks run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClaimViolation {
    /// The header algorithm is not on the approved list
    #[error("algorithm {0} is not approved")]
    Algorithm(Algorithm),

    /// `exp` has passed
    #[error("token expired")]
    Expired,

    /// `iat` lies in the future
    #[error("token issued in the future")]
    IssuedInFuture,

    /// `nbf` lies in the future
    #[error("token not yet valid")]
    NotYetValid,

    /// `iss` is not the required issuer
    #[error("issuer not accepted")]
    Issuer,

    /// `aud` names none of the accepted audiences
    #[error("no accepted audience")]
    Audience,

    /// `sub` is not the required subject
    #[error("subject not accepted")]
    Subject,

    /// A claim the profile depends on is absent
    #[error("required claim `{0}` is missing")]
    Missing(&'static str),

    /// Raised by an additional validator
    #[error(transparent)]
    Custom(Box<dyn StdError + Send + Sync>),
}

/// A required subject cannot be turned into a matcher
#[derive(Debug, Error)]
#[error("unusable subject")]
pub struct SubjectError(#[from] regex::Error);
