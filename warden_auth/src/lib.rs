//! Bearer-token authentication backed by JSON Web Tokens
//!
//! [`JwtAuth`] verifies compact JWTs against a set of configured keys,
//! validates their claims against a [`ValidationProfile`], and produces a
//! [`Principal`] carrying the claims and a cache of authorizations derived
//! from them. The same provider issues new tokens from application claims
//! and [`GenerationOptions`].
//!
//! Keys are fixed when the provider is constructed. They may be given
//! inline, loaded from a key-store file, or (with the `reqwest` feature)
//! fetched from a remote JWKS endpoint.
//!
//! Tokens using the unsecured `none` algorithm are only ever accepted by a
//! provider built explicitly with [`JwtAuth::unsecured`], which holds no
//! keys. Rewriting the header of a signed token to `none` never helps an
//! attacker against a provider holding keys.
//!
//! # Example
//!
//! ```
//! use warden::{jwa, jwt::Claims, Jwk};
//! use warden_auth::{AuthOptions, Credentials, GenerationOptions, JwtAuth, ValidationProfile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = Jwk::from(jwa::Hmac::from_passphrase("secret"));
//! let options = AuthOptions::default()
//!     .add_key(key)
//!     .with_jwt_options(ValidationProfile::default().with_issuer("authority"));
//! let auth = JwtAuth::new(options)?;
//!
//! let payload = Claims::new().with_subject("paulo");
//! let token = auth.generate_token(
//!     &payload,
//!     &GenerationOptions::default()
//!         .with_issuer("authority")
//!         .expires_in_minutes(5)
//!         .add_permission("read"),
//! )?;
//!
//! let mut principal = auth.authenticate(&Credentials::token(token))?;
//! assert_eq!(principal.claims().get_str("sub"), Some("paulo"));
//!
//! let permissions = warden_auth::JwtAuthorization::permissions()
//!     .get_authorizations(&mut principal)
//!     .clone();
//! assert!(permissions.contains(warden_auth::PermissionRef::from_str("read")));
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! When using this crate and the `reqwest` feature to load keys from a
//! remote JWKS, this crate does not automatically enable TLS support in
//! `reqwest` itself. If your application already uses `reqwest` with some
//! TLS settings (native/OpenSSL/rustls), then this crate will use those
//! settings automatically. However, if the only reason you are using
//! `reqwest` is transitively through this crate, you may need to enable
//! the `default-tls` or `rustls-tls` feature to enable support for calling
//! out to an HTTPS endpoint.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod authority;
pub mod authorization;
mod credentials;
pub mod error;
pub mod issuer;
pub mod key_store;
mod options;
mod policy;
mod principal;
mod provider;
mod resolver;
pub mod scope;
pub mod webauthn;

pub use authority::Authority;
pub use authorization::{
    Authorizations, JwtAuthorization, Permission, PermissionBasedAuthorization, PermissionRef,
};
pub use credentials::Credentials;
pub use error::{AuthError, KeyStoreError};
pub use key_store::{KeyStoreLoader, KeyStoreOptions};
pub use options::{AuthOptions, GenerationOptions, ValidationProfile};
pub use policy::Policy;
pub use principal::Principal;
pub use provider::JwtAuth;
pub use resolver::KeyResolver;
pub use scope::{Scope, ScopeRef};
pub use webauthn::WebAuthnOptions;
