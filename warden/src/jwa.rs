//! JSON Web Algorithms ([RFC7518][])
//!
//! Every signing family is always compiled in. Each [`Algorithm`] names the
//! [`Family`] of key it needs; the family modules hold the per-algorithm
//! parameters for the cryptographic backend.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::error;

pub mod ec;
pub mod hmac;
mod none;
pub mod rsa;

#[doc(inline)]
pub use ec::{Curve, EllipticCurve};
#[doc(inline)]
pub use hmac::Hmac;
pub use none::Unsecured;
#[doc(inline)]
pub use rsa::Rsa;

/// A JWS algorithm, as named in the `alg` header
///
/// Parsing is case-sensitive and accepts only the registered names
/// listed here. `ES512` is not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512
    PS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
    /// No signature at all (`none`)
    None,
}

/// The kind of key an algorithm is used with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// A shared secret (`kty` of `oct`)
    Hmac,
    /// An RSA key pair
    Rsa,
    /// An elliptic curve key pair on the given curve
    EllipticCurve(Curve),
    /// No key; only [`Unsecured`] handles this family
    Unsecured,
}

impl Algorithm {
    /// Every supported algorithm
    pub const ALL: [Algorithm; 12] = [
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::None,
    ];

    /// The registered name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::None => "none",
        }
    }

    /// The kind of key this algorithm needs
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => Family::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512 => {
                Family::Rsa
            }
            Self::ES256 => Family::EllipticCurve(Curve::P256),
            Self::ES384 => Family::EllipticCurve(Curve::P384),
            Self::None => Family::Unsecured,
        }
    }

    /// Whether this is `none`
    #[must_use]
    pub const fn is_unsecured(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| error::UnknownAlgorithm(s.to_owned()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
