//! Loading keys from a key store
//!
//! The built-in loader understands JSON Web Key Set files (type `jwks`).
//! Other store formats can be supported by implementing [`KeyStoreLoader`]
//! and passing the loader to
//! [`JwtAuth::with_loader()`][crate::JwtAuth::with_loader].

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use warden::Jwks;

use crate::KeyStoreError;

/// The key store type read by [`JwksFileLoader`]
pub const JWKS: &str = "jwks";

fn default_type() -> String {
    JWKS.to_owned()
}

/// Location and format of a key store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct KeyStoreOptions {
    path: PathBuf,
    #[serde(rename = "type", default = "default_type")]
    store_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl KeyStoreOptions {
    /// A JWKS file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store_type: default_type(),
            password: None,
        }
    }

    /// Sets the store type
    pub fn with_type(self, store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
            ..self
        }
    }

    /// Sets the password protecting the store
    pub fn with_password(self, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..self
        }
    }

    /// Location of the store
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Store type
    #[must_use]
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    /// Password, if any
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    fn is_jwks(&self) -> bool {
        self.store_type.eq_ignore_ascii_case(JWKS)
    }
}

impl fmt::Debug for KeyStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStoreOptions")
            .field("path", &self.path)
            .field("type", &self.store_type)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Reads keys from a key store
pub trait KeyStoreLoader {
    /// Loads the keys described by `options`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or parsed, or if the
    /// loader does not understand its type.
    fn load(&self, options: &KeyStoreOptions) -> Result<Jwks, KeyStoreError>;
}

impl<T: KeyStoreLoader + ?Sized> KeyStoreLoader for &'_ T {
    #[inline]
    fn load(&self, options: &KeyStoreOptions) -> Result<Jwks, KeyStoreError> {
        T::load(self, options)
    }
}

/// Loads JSON Web Key Set files
///
/// Entries the set cannot understand are skipped with a warning.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwksFileLoader;

impl JwksFileLoader {
    /// Loads a JWKS file without blocking the async runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the store is not of type `jwks`, or the file
    /// cannot be read or parsed.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub async fn load_async(&self, options: &KeyStoreOptions) -> Result<Jwks, KeyStoreError> {
        check_type(options)?;
        let data = tokio::fs::read(&options.path)
            .await
            .map_err(|source| KeyStoreError::Io {
                path: options.path.clone(),
                source,
            })?;
        parse(options, &data)
    }
}

impl KeyStoreLoader for JwksFileLoader {
    fn load(&self, options: &KeyStoreOptions) -> Result<Jwks, KeyStoreError> {
        check_type(options)?;
        let data = std::fs::read(&options.path).map_err(|source| KeyStoreError::Io {
            path: options.path.clone(),
            source,
        })?;
        parse(options, &data)
    }
}

fn check_type(options: &KeyStoreOptions) -> Result<(), KeyStoreError> {
    if options.is_jwks() {
        Ok(())
    } else {
        tracing::debug!(key_store.kind = %options.store_type, "unsupported key store type");
        Err(KeyStoreError::UnsupportedKeyStore(options.store_type.clone()))
    }
}

fn parse(options: &KeyStoreOptions, data: &[u8]) -> Result<Jwks, KeyStoreError> {
    let jwks: Jwks = serde_json::from_slice(data).map_err(|source| KeyStoreError::Parse {
        path: options.path.clone(),
        source,
    })?;

    tracing::debug!(
        key_store.path = %options.path.display(),
        keys.count = jwks.len(),
        "key store read"
    );

    Ok(jwks)
}
