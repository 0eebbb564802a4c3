use aliri_clock::UnixTime;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Audience, AudienceRef, Issuer, IssuerRef, Subject, SubjectRef};
use crate::error::MalformedToken;

/// An ordered set of JWT claims
///
/// Claims keep the order in which they were inserted or decoded, so a
/// payload serializes back to the same bytes it was read from.
///
/// Registered claims are type-checked on decoding: `exp`, `iat` and `nbf`
/// must be non-negative numbers, `iss` and `sub` strings, and `aud` a
/// string or an array of strings. Other claims may hold any JSON value.
///
/// Times with a fractional part are truncated toward zero, so an `exp` of
/// `100.5` is read as `100`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
#[must_use]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// An empty claim set
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// The raw value of a claim
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim's value, if it is a string
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// The string entries of an array-valued claim
    ///
    /// `None` if the claim is missing or not an array. Entries that are not
    /// strings are skipped.
    pub fn get_str_array<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        self.0
            .get(name)
            .and_then(Value::as_array)
            .map(|v| v.iter().filter_map(Value::as_str))
    }

    /// Whether the claim is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Sets a claim
    ///
    /// A claim that is already present keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// The claims in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of claims
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no claims
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `exp`
    #[must_use]
    pub fn exp(&self) -> Option<UnixTime> {
        self.time("exp")
    }

    /// `iat`
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.time("iat")
    }

    /// `nbf`
    #[must_use]
    pub fn nbf(&self) -> Option<UnixTime> {
        self.time("nbf")
    }

    /// `iss`
    #[must_use]
    pub fn iss(&self) -> Option<&IssuerRef> {
        self.get_str("iss").map(IssuerRef::from_str)
    }

    /// `sub`
    #[must_use]
    pub fn sub(&self) -> Option<&SubjectRef> {
        self.get_str("sub").map(SubjectRef::from_str)
    }

    /// `aud`, whether written as one string or an array
    pub fn aud(&self) -> Audiences {
        match self.0.get("aud") {
            Some(Value::String(s)) => Audiences::from(Audience::from(s.as_str())),
            Some(Value::Array(v)) => v
                .iter()
                .filter_map(Value::as_str)
                .map(Audience::from)
                .collect(),
            _ => Audiences::default(),
        }
    }

    /// Sets `sub`
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.insert("sub", sub.into().take());
        self
    }

    /// Sets `iss`
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.insert("iss", iss.into().take());
        self
    }

    /// Sets `aud`: a string for one audience, an array otherwise
    pub fn with_audiences(mut self, aud: impl Into<Audiences>) -> Self {
        self.insert("aud", aud.into().into_value());
        self
    }

    /// Sets `exp`
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.insert("exp", time.0);
        self
    }

    /// Sets `iat`
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.insert("iat", time.0);
        self
    }

    /// Sets `nbf`
    pub fn with_not_before(mut self, time: UnixTime) -> Self {
        self.insert("nbf", time.0);
        self
    }

    fn time(&self, name: &str) -> Option<UnixTime> {
        self.0.get(name).and_then(unix_time)
    }
}

fn unix_time(value: &Value) -> Option<UnixTime> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(secs) = n.as_u64() {
        return Some(UnixTime(secs));
    }

    // truncates toward zero
    n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.)
        .map(|f| UnixTime(f as u64))
}

impl TryFrom<Map<String, Value>> for Claims {
    type Error = MalformedToken;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mistyped = |name: &str, ok: fn(&Value) -> bool| map.get(name).is_some_and(|v| !ok(v));

        for name in ["exp", "iat", "nbf"] {
            if mistyped(name, |v| unix_time(v).is_some()) {
                return Err(MalformedToken::ClaimType(name));
            }
        }
        for name in ["iss", "sub"] {
            if mistyped(name, Value::is_string) {
                return Err(MalformedToken::ClaimType(name));
            }
        }
        if mistyped("aud", is_audience) {
            return Err(MalformedToken::ClaimType("aud"));
        }

        Ok(Self(map))
    }
}

fn is_audience(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Array(v) => v.iter().all(Value::is_string),
        _ => false,
    }
}

impl From<Claims> for Value {
    fn from(claims: Claims) -> Self {
        Value::Object(claims.0)
    }
}

impl Serialize for Claims {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Zero or more [`Audience`]s
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// Whether there are none
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of audiences
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `aud` is among them
    #[must_use]
    pub fn contains(&self, aud: &AudienceRef) -> bool {
        self.iter().any(|a| a == aud)
    }

    /// The audiences in order
    pub fn iter(&self) -> impl Iterator<Item = &AudienceRef> {
        self.0.iter().map(AsRef::as_ref)
    }

    fn into_value(mut self) -> Value {
        match self.0.len() {
            1 => self.0.pop().map(Audience::take).into(),
            _ => self.0.into_iter().map(Audience::take).collect(),
        }
    }
}

impl From<Audience> for Audiences {
    fn from(aud: Audience) -> Self {
        Self(vec![aud])
    }
}

impl From<Vec<Audience>> for Audiences {
    fn from(auds: Vec<Audience>) -> Self {
        Self(auds)
    }
}

impl FromIterator<Audience> for Audiences {
    fn from_iter<T: IntoIterator<Item = Audience>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
