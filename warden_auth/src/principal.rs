use std::collections::HashMap;

use serde_json::{Map, Value};
use warden::{
    jwa,
    jwt::{Claims, SubjectRef},
};

use crate::Authorizations;

/// The identity established by a successfully verified token
///
/// A principal is produced fresh for every authentication. Alongside the
/// validated claims it holds an attributes bag with the decoded payload
/// (`accessToken`) and the verifying algorithm (`alg`), and an owned
/// cache of authorizations derived from the claims.
#[derive(Clone, Debug)]
pub struct Principal {
    claims: Claims,
    attributes: Map<String, Value>,
    authorizations: HashMap<String, Authorizations>,
}

impl Principal {
    /// Builds a principal from validated claims
    pub fn new(claims: Claims, alg: jwa::Algorithm) -> Self {
        let mut attributes = Map::new();
        attributes.insert(
            "accessToken".to_owned(),
            Value::from(claims.clone()),
        );
        attributes.insert("alg".to_owned(), Value::from(alg.name()));

        Self {
            claims,
            attributes,
            authorizations: HashMap::new(),
        }
    }

    /// The validated claims
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The subject (`sub`) of the token, if any
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.claims.sub()
    }

    /// All attributes
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// A single attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The decoded payload of the access token
    pub fn access_token(&self) -> Option<&Map<String, Value>> {
        self.attributes.get("accessToken").and_then(Value::as_object)
    }

    /// The cached authorizations read from `claim_key`, if computed
    pub fn cached_authorizations(&self, claim_key: &str) -> Option<&Authorizations> {
        self.authorizations.get(claim_key)
    }

    /// Every cached authorization set, keyed by source claim
    pub fn authorizations(&self) -> impl Iterator<Item = (&str, &Authorizations)> {
        self.authorizations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drops all cached authorizations
    ///
    /// They are recomputed from the claims on next request.
    pub fn clear_cache(&mut self) {
        self.authorizations.clear();
    }

    pub(crate) fn authorizations_or_insert_with<F>(
        &mut self,
        claim_key: &str,
        compute: F,
    ) -> &Authorizations
    where
        F: FnOnce(&Claims) -> Authorizations,
    {
        let claims = &self.claims;
        self.authorizations
            .entry(claim_key.to_owned())
            .or_insert_with(|| compute(claims))
    }
}
