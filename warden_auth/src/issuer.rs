//! Issuing signed tokens
//!
//! The claims of an issued token are the application's payload, in its own
//! order, merged with claims derived from [`GenerationOptions`]. See
//! [`merge_claims()`] for the rules.

use aliri_clock::UnixTime;
use serde_json::Value;
use warden::{
    jwa,
    jwt::{Audiences, Claims, Header},
    Jwt,
};

use crate::{error, scope, AuthError, GenerationOptions, KeyResolver};

/// Merges a payload with the claims derived from `options`
///
/// * `iat` is set to `now` unless the options omit timestamps or the
///   payload already carries one.
/// * `exp` is set to `now` plus the expiry, when one is given and the
///   payload carries none.
/// * `aud` is set from the option audiences: a string for one audience,
///   an array for several.
/// * `scope` is set to the option scopes joined with the option delimiter.
/// * `iss` and `sub` are set from the options. A claim already present in
///   the payload keeps its position.
/// * `permissions` keeps the payload's entries and gains the option
///   permissions it does not already hold.
pub fn merge_claims(payload: &Claims, options: &GenerationOptions, now: UnixTime) -> Claims {
    let mut claims = payload.clone();

    if !options.omits_timestamp() && !claims.contains("iat") {
        claims.insert("iat", now.0);
    }

    if let Some(expiry) = options.expiry() {
        if !claims.contains("exp") {
            claims.insert("exp", now.0.saturating_add(expiry));
        }
    }

    if !options.audience().is_empty() {
        claims = claims.with_audiences(options.audience().iter().cloned().collect::<Audiences>());
    }

    if !options.scopes().is_empty() {
        claims.insert(
            "scope",
            scope::join(options.scopes(), options.scope_delimiter()),
        );
    }

    if let Some(iss) = options.issuer() {
        claims = claims.with_issuer(iss.to_owned());
    }

    if let Some(sub) = options.subject() {
        claims = claims.with_subject(sub.to_owned());
    }

    if !options.permissions().is_empty() {
        let mut permissions = match claims.get("permissions") {
            Some(Value::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };

        for p in options.permissions() {
            if !permissions.iter().any(|v| v.as_str() == Some(p.as_str())) {
                permissions.push(Value::from(p.as_str()));
            }
        }

        claims.insert("permissions", permissions);
    }

    claims
}

/// Builds and signs tokens with the keys of a [`KeyResolver`]
#[derive(Clone, Copy, Debug)]
pub struct TokenIssuer<'a> {
    resolver: &'a KeyResolver,
    default_algorithm: Option<jwa::Algorithm>,
}

impl<'a> TokenIssuer<'a> {
    /// An issuer signing with the keys of `resolver`
    ///
    /// Tokens are signed with `default_algorithm` unless the generation
    /// options choose another, falling back to `HS256` when neither does.
    #[must_use]
    pub fn new(resolver: &'a KeyResolver, default_algorithm: Option<jwa::Algorithm>) -> Self {
        Self {
            resolver,
            default_algorithm,
        }
    }

    /// The algorithm a token generated with `options` will be signed with
    #[must_use]
    pub fn algorithm(&self, options: &GenerationOptions) -> jwa::Algorithm {
        options
            .algorithm()
            .or(self.default_algorithm)
            .unwrap_or(jwa::Algorithm::HS256)
    }

    /// Generates a signed token
    ///
    /// An unsecured resolver only issues `none` tokens, with an empty
    /// signature. Any other resolver never issues them.
    ///
    /// # Errors
    ///
    /// Returns an error if no single key can sign with the selected
    /// algorithm, or if signing fails.
    pub fn issue(
        &self,
        payload: &Claims,
        options: &GenerationOptions,
        now: UnixTime,
    ) -> Result<Jwt, AuthError> {
        let alg = self.algorithm(options);
        let claims = merge_claims(payload, options, now);

        if self.resolver.is_unsecured() || alg.is_unsecured() {
            if !(self.resolver.is_unsecured() && alg.is_unsecured()) {
                tracing::debug!(%alg, "unsigned tokens require an unsecured provider");
                return Err(error::no_matching_key(alg, options.key_id()));
            }

            return Ok(Jwt::sign(&Header::new(alg), &claims, &jwa::Unsecured)?);
        }

        let key = self.resolver.signing_key(alg, options.key_id())?;
        let header = match key.key_id() {
            Some(kid) => Header::new(alg).with_key_id(kid.to_owned()),
            None => Header::new(alg),
        };

        let token = Jwt::sign(&header, &claims, key)?;
        tracing::debug!(%alg, kid = ?key.key_id(), "token issued");

        Ok(token)
    }
}
