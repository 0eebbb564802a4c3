use std::fmt;

use serde::{Deserialize, Serialize};
use warden::Jwt;

/// Credentials presented for authentication
///
/// Only bearer tokens are understood by [`JwtAuth`][crate::JwtAuth].
/// Other shapes are rejected before any decoding takes place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// A compact JWT
    Token {
        /// The token
        token: Jwt,
    },

    /// A username and password
    UsernamePassword {
        /// The username
        username: String,
        /// The password
        password: String,
    },
}

impl Credentials {
    /// Bearer token credentials
    pub fn token(token: impl Into<Jwt>) -> Self {
        Self::Token {
            token: token.into(),
        }
    }

    /// Username and password credentials
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { token } => f.debug_struct("Token").field("token", token).finish(),
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
