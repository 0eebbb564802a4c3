//! Configuration for public-key credential (WebAuthn) authentication
//!
//! Only the configuration shape is provided here. Registration and
//! assertion ceremonies are left to the application.
//!
//! Deserialization is lenient: unknown fields, and fields holding a value
//! of the wrong type or an unrecognized name, are ignored and leave the
//! default in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden::jwa;

/// The attestation conveyance preference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Attestation {
    /// No attestation statement is wanted
    None,
    /// An anonymized attestation statement is acceptable
    Indirect,
    /// The authenticator's own attestation statement is wanted
    Direct,
}

/// Where the authenticator is attached
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticatorAttachment {
    /// A roaming authenticator, such as a security key
    CrossPlatform,
    /// An authenticator built into the client device
    Platform,
}

/// The user verification requirement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserVerification {
    /// Verification is required
    Required,
    /// Verification is preferred but not required
    Preferred,
    /// Verification should not be performed
    Discouraged,
}

/// A transport by which the client reaches an authenticator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transport {
    /// USB
    Usb,
    /// Near-field communication
    Nfc,
    /// Bluetooth low energy
    Ble,
    /// Built into the client device
    Internal,
}

/// The relying party the credentials are scoped to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct RelayParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

impl RelayParty {
    /// A relying party with a display name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the relying party identifier, usually a domain
    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    /// Sets the icon URL
    pub fn with_icon(self, icon: impl Into<String>) -> Self {
        Self {
            icon: Some(icon.into()),
            ..self
        }
    }

    /// Identifier
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Icon URL
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_owned);
        Self {
            id: text("id"),
            name: text("name"),
            icon: text("icon"),
        }
    }
}

/// WebAuthn configuration
///
/// ```
/// use warden_auth::webauthn::{UserVerification, WebAuthnOptions};
///
/// # fn main() -> Result<(), serde_json::Error> {
/// let options: WebAuthnOptions = serde_json::from_str(r#"{
///     "origin": "https://example.com",
///     "userVerification": "REQUIRED",
///     "timeout": "soon"
/// }"#)?;
///
/// assert_eq!(options.user_verification(), Some(UserVerification::Required));
/// assert_eq!(options.timeout(), 60_000);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
#[must_use]
pub struct WebAuthnOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    attestation: Option<Attestation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authenticator_attachment: Option<AuthenticatorAttachment>,
    challenge_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    pub_key_cred_params: Vec<jwa::Algorithm>,
    relay_party: RelayParty,
    #[serde(skip_serializing_if = "Option::is_none")]
    require_resident_key: Option<bool>,
    timeout: u64,
    transports: Vec<Transport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_verification: Option<UserVerification>,
}

const DEFAULT_CHALLENGE_LENGTH: u32 = 64;
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

impl Default for WebAuthnOptions {
    fn default() -> Self {
        Self {
            attestation: None,
            authenticator_attachment: None,
            challenge_length: DEFAULT_CHALLENGE_LENGTH,
            origin: None,
            pub_key_cred_params: vec![jwa::Algorithm::ES256, jwa::Algorithm::RS256],
            relay_party: RelayParty::default(),
            require_resident_key: None,
            timeout: DEFAULT_TIMEOUT_MS,
            transports: vec![
                Transport::Usb,
                Transport::Nfc,
                Transport::Ble,
                Transport::Internal,
            ],
            user_verification: None,
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

fn parse_all<T: serde::de::DeserializeOwned + PartialEq>(values: &[Value]) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if let Some(item) = v.as_str().and_then(|_| parse::<T>(v)) {
            if !out.contains(&item) {
                out.push(item);
            }
        }
    }
    out
}

impl From<Map<String, Value>> for WebAuthnOptions {
    fn from(map: Map<String, Value>) -> Self {
        let mut options = Self::default();

        for (name, value) in &map {
            match (name.as_str(), value) {
                ("attestation", Value::String(_)) => {
                    options.attestation = parse(value).or(options.attestation);
                }
                ("authenticatorAttachment", Value::String(_)) => {
                    options.authenticator_attachment =
                        parse(value).or(options.authenticator_attachment);
                }
                ("challengeLength", Value::Number(n)) => {
                    if let Some(n) = n.as_u64().and_then(|n| u32::try_from(n).ok()) {
                        options.challenge_length = n;
                    }
                }
                ("origin", Value::String(s)) => options.origin = Some(s.clone()),
                ("pubKeyCredParams", Value::Array(items)) => {
                    options.pub_key_cred_params = parse_all(items);
                }
                ("relayParty", Value::Object(rp)) => options.relay_party = RelayParty::from_map(rp),
                ("requireResidentKey", Value::Bool(b)) => options.require_resident_key = Some(*b),
                ("timeout", Value::Number(n)) => {
                    if let Some(n) = n.as_u64() {
                        options.timeout = n;
                    }
                }
                ("transports", Value::Array(items)) => options.transports = parse_all(items),
                ("userVerification", Value::String(_)) => {
                    options.user_verification = parse(value).or(options.user_verification);
                }
                _ => {}
            }
        }

        options
    }
}

impl WebAuthnOptions {
    /// Sets the attestation preference
    pub fn with_attestation(self, attestation: Attestation) -> Self {
        Self {
            attestation: Some(attestation),
            ..self
        }
    }

    /// Sets the authenticator attachment
    pub fn with_authenticator_attachment(self, attachment: AuthenticatorAttachment) -> Self {
        Self {
            authenticator_attachment: Some(attachment),
            ..self
        }
    }

    /// Sets the challenge length in bytes
    pub fn with_challenge_length(self, challenge_length: u32) -> Self {
        Self {
            challenge_length,
            ..self
        }
    }

    /// Sets the expected origin
    pub fn with_origin(self, origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            ..self
        }
    }

    /// Replaces the accepted credential algorithms, in order of preference
    pub fn with_pub_key_cred_params<I: IntoIterator<Item = jwa::Algorithm>>(self, algs: I) -> Self {
        Self {
            pub_key_cred_params: algs.into_iter().collect(),
            ..self
        }
    }

    /// Sets the relying party
    pub fn with_relay_party(self, relay_party: RelayParty) -> Self {
        Self {
            relay_party,
            ..self
        }
    }

    /// Sets whether a resident key is required
    pub fn with_require_resident_key(self, required: bool) -> Self {
        Self {
            require_resident_key: Some(required),
            ..self
        }
    }

    /// Sets the ceremony timeout in milliseconds
    pub fn with_timeout(self, timeout: u64) -> Self {
        Self { timeout, ..self }
    }

    /// Replaces the allowed transports
    pub fn with_transports<I: IntoIterator<Item = Transport>>(self, transports: I) -> Self {
        Self {
            transports: transports.into_iter().collect(),
            ..self
        }
    }

    /// Sets the user verification requirement
    pub fn with_user_verification(self, verification: UserVerification) -> Self {
        Self {
            user_verification: Some(verification),
            ..self
        }
    }

    /// Attestation preference
    #[must_use]
    pub fn attestation(&self) -> Option<Attestation> {
        self.attestation
    }

    /// Authenticator attachment
    #[must_use]
    pub fn authenticator_attachment(&self) -> Option<AuthenticatorAttachment> {
        self.authenticator_attachment
    }

    /// Challenge length in bytes
    #[must_use]
    pub fn challenge_length(&self) -> u32 {
        self.challenge_length
    }

    /// Expected origin
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Accepted credential algorithms
    #[must_use]
    pub fn pub_key_cred_params(&self) -> &[jwa::Algorithm] {
        &self.pub_key_cred_params
    }

    /// Relying party
    pub fn relay_party(&self) -> &RelayParty {
        &self.relay_party
    }

    /// Whether a resident key is required
    #[must_use]
    pub fn require_resident_key(&self) -> Option<bool> {
        self.require_resident_key
    }

    /// Ceremony timeout in milliseconds
    #[must_use]
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Allowed transports
    #[must_use]
    pub fn transports(&self) -> &[Transport] {
        &self.transports
    }

    /// User verification requirement
    #[must_use]
    pub fn user_verification(&self) -> Option<UserVerification> {
        self.user_verification
    }
}
