//! JSON Web Token signing, verification and claims validation
//!
//! This crate implements the signature side of the Javascript/JSON Object
//! Signing and Encryption (JOSE) standards:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Key (JWK): [RFC7517][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][]
//!
//! Supported algorithms are HMAC (`HS256`, `HS384`, `HS512`), RSA
//! (`RS256`, `RS384`, `RS512`, `PS256`, `PS384`, `PS512`), ECDSA (`ES256`,
//! `ES384`) and the unsecured `none`. No JWK is ever compatible with
//! `none`; such tokens can only be verified with [`jwa::Unsecured`].
//!
//! JSON Web Encryption (JWE) is not supported.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use aliri_clock::System;
//! use warden::{error::ClaimViolation, jwa, jwk, jwt, Jwk, Jwks, JwtRef};
//!
//! struct NoExtraChecks;
//!
//! impl jwt::ClaimsValidator for NoExtraChecks {
//!     fn validate(&self, _: &jwt::Header, _: &jwt::Claims) -> Result<(), ClaimViolation> {
//!         Ok(())
//!     }
//! }
//!
//! let token = JwtRef::from_str(concat!(
//!     "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiIsImtpZCI6InRlc3Qga2V5In0.",
//!     "eyJzdWIiOiJ3YXJkZW4iLCJhdWQiOiJteV9hcGkiLCJpc3MiOiJhdXRob3JpdHkifQ.",
//!     "93WInhAioDUO3IBit4BuK-uh1-E5Ht1ynztxkXernjA"
//! ));
//!
//! let keys: Jwks = [Jwk::from(jwa::Hmac::from_passphrase("test"))
//!     .with_algorithm(jwa::Algorithm::HS256)
//!     .with_key_id(jwk::KeyId::from_static("test key"))]
//! .into_iter()
//! .collect();
//!
//! let validator = jwt::CoreValidator::default()
//!     .add_approved_algorithm(jwa::Algorithm::HS256)
//!     .add_allowed_audience(jwt::Audience::from_static("my_api"))
//!     .require_issuer(jwt::Issuer::from_static("authority"));
//!
//! let decomposed = token.decompose()?;
//! let header = decomposed.header();
//! let key = keys
//!     .candidates(header.kid(), header.alg())
//!     .next()
//!     .expect("no key for this token");
//!
//! decomposed.verify_signature(key)?;
//! let validated = decomposed.validate(&validator, NoExtraChecks, &System)?;
//! assert_eq!(validated.claims().get_str("sub"), Some("warden"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
