/*!
 Signed messages compatible with `ActiveSupport::MessageVerifier`.

 Only the configuration Rails uses for JSON serialized messages is supported:

 ```ruby
 ActiveSupport::MessageVerifier.new(secret, digest: "SHA256", serializer: JSON)
 ```

 A signed message is `<base64 metadata>--<hex HMAC-SHA256 of the base64 metadata>`, where the
 metadata is the JSON envelope produced by [`Metadata::to_json`].
*/

use std::fmt::Display;

use base64::{prelude::BASE64_STANDARD, Engine};
use hmac::{digest::Key, Hmac, Mac};
use json::{from, object, JsonValue};
use sha2::{Digest, Sha256};

use crate::error::message_verifier::VerifierError;

type HmacSha256 = Hmac<Sha256>;

/// Separates the data from its digest, and the parts of an encrypted cookie
pub(crate) const SEPARATOR: &str = "--";

/// Signs and verifies messages with a shared secret
pub struct MessageVerifier {
    /// The secret as an HMAC block, so building a MAC cannot fail
    key: Key<HmacSha256>,
}

impl MessageVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut key = Key::<HmacSha256>::default();
        if secret.len() > key.len() {
            let digest = <Sha256 as Digest>::digest(secret);
            key[..digest.len()].copy_from_slice(&digest);
        } else {
            key[..secret.len()].copy_from_slice(secret);
        }
        Self { key }
    }

    /// Sign the text of `value` for `purpose`
    ///
    /// # Example
    ///
    /// ```
    /// use rails_compat::active_support::message_verifier::MessageVerifier;
    ///
    /// let verifier = MessageVerifier::new(b"secret");
    /// let signed = verifier.generate(42, "answer");
    /// assert_eq!(verifier.verify(&signed, "answer").unwrap(), Some("42".to_string()));
    /// ```
    pub fn generate(&self, value: impl Display, purpose: &str) -> String {
        let data = BASE64_STANDARD.encode(Metadata::wrap(value.to_string(), purpose).to_json());
        let digest = self.digest(&data);
        format!("{data}{SEPARATOR}{digest}")
    }

    /// Get the message signed in `signed_message` if the signature and purpose match
    ///
    /// Messages that are not signed with this verifier's secret yield `Ok(None)`. Errors are only
    /// returned for correctly signed messages whose body cannot be read.
    pub fn verify(
        &self,
        signed_message: &str,
        purpose: &str,
    ) -> Result<Option<String>, VerifierError> {
        let parts: Vec<&str> = signed_message.split(SEPARATOR).collect();
        let [data, digest] = parts.as_slice() else {
            return Ok(None);
        };
        let Some(digest) = hex::decode(digest).ok() else {
            return Ok(None);
        };

        let mut mac = self.mac();
        mac.update(data.as_bytes());
        if mac.verify_slice(&digest).is_err() {
            return Ok(None);
        }

        let bytes = BASE64_STANDARD
            .decode(data)
            .map_err(VerifierError::InvalidBase64)?;
        let json = String::from_utf8(bytes).map_err(VerifierError::InvalidUtf8)?;
        Ok(Metadata::from_json(&json)?
            .verify_purpose(purpose)
            .map(str::to_string))
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new(&self.key)
    }

    /// Lowercase hex HMAC-SHA256 of `data`
    fn digest(&self, data: &str) -> String {
        let mut mac = self.mac();
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// The `_rails` envelope that carries a message and its purpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The message text, not base64 encoded
    pub message: String,
    pub purpose: String,
}

impl Metadata {
    pub fn wrap(message: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            purpose: purpose.into(),
        }
    }

    /// Serialize as compact JSON, with the message base64 encoded
    ///
    /// Messages never expire, so `exp` is always `null`.
    pub fn to_json(&self) -> String {
        let mut rails = object! {};
        rails["message"] = from(BASE64_STANDARD.encode(&self.message));
        rails["exp"] = JsonValue::Null;
        rails["pur"] = from(self.purpose.as_str());

        let mut envelope = object! {};
        envelope["_rails"] = rails;
        envelope.dump()
    }

    pub fn from_json(data: &str) -> Result<Self, VerifierError> {
        let (message, purpose) = read_envelope(data)?;
        let bytes = BASE64_STANDARD
            .decode(message)
            .map_err(VerifierError::InvalidBase64)?;
        Ok(Self {
            message: String::from_utf8(bytes).map_err(VerifierError::InvalidUtf8)?,
            purpose,
        })
    }

    /// Get the message if it was signed for `purpose`
    pub fn verify_purpose(&self, purpose: &str) -> Option<&str> {
        (self.purpose == purpose).then_some(self.message.as_str())
    }
}

/// Read the still base64 encoded message and the purpose out of a `_rails` envelope
pub(crate) fn read_envelope(data: &str) -> Result<(String, String), VerifierError> {
    let parsed = json::parse(data).map_err(VerifierError::InvalidJson)?;
    let rails = &parsed["_rails"];
    if !rails.is_object() {
        return Err(VerifierError::MissingField("_rails"));
    }

    let message = rails["message"]
        .as_str()
        .ok_or(VerifierError::MissingField("message"))?;
    let purpose = rails["pur"]
        .as_str()
        .ok_or(VerifierError::MissingField("pur"))?;
    Ok((message.to_string(), purpose.to_string()))
}
