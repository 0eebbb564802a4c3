//! Scope requirements carried in the `scope` claim

use aliri_braid::braid;
use serde_json::Value;
use thiserror::Error;
use warden::{
    error::ClaimViolation,
    jwt::{Claims, ClaimsValidator, Header},
};

/// A single scope
#[braid(serde, ref_doc = "A borrowed reference to a [`Scope`]")]
pub struct Scope;

/// The token did not grant the scopes required of it
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InsufficientScope {
    /// The token has no `scope` claim
    #[error("scope claim missing")]
    Missing,

    /// The `scope` claim is not a delimited string
    #[error("scope claim is not a delimited string")]
    NotAString,

    /// A required scope was not granted
    #[error("required scope '{0}' not granted")]
    NotGranted(Scope),
}

/// Requires that the token's `scope` claim grant a set of scopes
///
/// The claim must be a single string, split on the configured delimiter.
/// An array-valued claim is rejected whatever it contains. When no scopes
/// are required, the claim is not inspected at all.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct ScopeValidator {
    required: Vec<Scope>,
    delimiter: String,
}

impl Default for ScopeValidator {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            delimiter: " ".to_owned(),
        }
    }
}

impl ScopeValidator {
    /// Requires every scope in `required`, delimited by `delimiter`
    pub fn new<I>(required: I, delimiter: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = Scope>,
    {
        Self {
            required: required.into_iter().collect(),
            delimiter: delimiter.into(),
        }
    }

    /// The required scopes
    #[must_use]
    pub fn required(&self) -> &[Scope] {
        &self.required
    }

    /// The delimiter separating scopes in the claim
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Checks that the claims grant every required scope
    ///
    /// # Errors
    ///
    /// Returns the first reason the scope requirement is not met.
    pub fn check(&self, claims: &Claims) -> Result<(), InsufficientScope> {
        if self.required.is_empty() {
            return Ok(());
        }

        let granted = match claims.get("scope") {
            None | Some(Value::Null) => return Err(InsufficientScope::Missing),
            Some(Value::String(s)) => s,
            Some(_) => return Err(InsufficientScope::NotAString),
        };

        let granted: Vec<&str> = if self.delimiter.is_empty() {
            granted.split_whitespace().collect()
        } else {
            granted.split(self.delimiter.as_str()).collect()
        };

        match self
            .required
            .iter()
            .find(|r| !granted.contains(&r.as_str()))
        {
            Some(missing) => Err(InsufficientScope::NotGranted(missing.clone())),
            None => Ok(()),
        }
    }
}

impl ClaimsValidator for ScopeValidator {
    fn validate(&self, _header: &Header, claims: &Claims) -> Result<(), ClaimViolation> {
        self.check(claims)
            .map_err(|e| ClaimViolation::Custom(Box::new(e)))
    }
}

/// Joins scopes into a single claim value
pub(crate) fn join(scopes: &[Scope], delimiter: &str) -> String {
    scopes
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(delimiter)
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;

    fn claims(value: Value) -> Result<Claims> {
        Ok(serde_json::from_value(value)?)
    }

    fn comma(required: &[&str]) -> ScopeValidator {
        ScopeValidator::new(required.iter().copied().map(Scope::from), ",")
    }

    #[test]
    fn grants_contained_scopes() -> Result<()> {
        let claims = claims(json!({ "scope": "a,b,c" }))?;
        comma(&["a", "b"]).check(&claims)?;
        Ok(())
    }

    #[test]
    fn rejects_ungranted_scope() -> Result<()> {
        let claims = claims(json!({ "scope": "a,b,c" }))?;
        assert_eq!(
            comma(&["b", "d"]).check(&claims),
            Err(InsufficientScope::NotGranted(Scope::from("d")))
        );
        Ok(())
    }

    #[test]
    fn rejects_array_scope_whatever_it_holds() -> Result<()> {
        let claims = claims(json!({ "scope": ["a", "b", "c"] }))?;
        assert_eq!(
            comma(&["a"]).check(&claims),
            Err(InsufficientScope::NotAString)
        );
        Ok(())
    }

    #[test]
    fn rejects_missing_scope() {
        assert_eq!(
            comma(&["a"]).check(&Claims::new()),
            Err(InsufficientScope::Missing)
        );
    }

    #[test]
    fn delimiter_is_respected() -> Result<()> {
        let claims = claims(json!({ "scope": "a b" }))?;
        assert!(comma(&["a"]).check(&claims).is_err());
        ScopeValidator::new([Scope::from("a"), Scope::from("b")], " ").check(&claims)?;
        Ok(())
    }

    #[test]
    fn nothing_required_skips_the_claim() -> Result<()> {
        let claims = claims(json!({ "scope": ["a"] }))?;
        ScopeValidator::default().check(&claims)?;
        Ok(())
    }

    #[test]
    fn joins_with_delimiter() {
        let scopes = [Scope::from("a"), Scope::from("b")];
        assert_eq!(join(&scopes, ","), "a,b");
        assert_eq!(join(&[], ","), "");
    }
}
