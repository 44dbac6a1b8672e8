/*!
 Decrypts Rails session cookies.

 Since Rails 5.2, the session cookie is encrypted with AES-256-GCM and looks like
 `<base64 ciphertext>--<base64 IV>--<base64 auth tag>`, URL encoded. The key is derived from the
 application's `secret_key_base`, and the plaintext is the `_rails` metadata envelope around a
 base64 `Marshal` dump of the session hash.
*/

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{prelude::BASE64_STANDARD, Engine};

use crate::{
    active_support::{
        key_generator::KeyGenerator,
        message_verifier::{read_envelope, SEPARATOR},
    },
    error::session::SessionError,
    util::marshal::{load, models::Value},
};

/// The salt Rails uses to derive the key for encrypted cookies
pub const COOKIE_SALT: &str = "authenticated encrypted cookie";
/// PBKDF2 rounds Rails uses when deriving cookie keys
pub const COOKIE_ITERATIONS: u32 = 1000;
/// AES-256 key size, in bits
const KEY_SIZE: usize = 32 * 8;
/// GCM nonce size, in bytes
const IV_LENGTH: usize = 12;
/// GCM authentication tag size, in bytes
const AUTH_TAG_LENGTH: usize = 16;

/// An encrypted session cookie and the secret needed to read it
pub struct SessionCookie {
    cookie_value: String,
    key_generator: KeyGenerator,
}

impl SessionCookie {
    /// Prepare to read `cookie_value`, exactly as it appears in the `Cookie` header
    pub fn from_cookie_value(cookie_value: impl Into<String>, secret_key_base: &str) -> Self {
        Self {
            cookie_value: cookie_value.into(),
            key_generator: KeyGenerator::with_cache(secret_key_base, COOKIE_ITERATIONS),
        }
    }

    /// Decrypt the cookie and load the session it contains
    pub fn decrypt(&self) -> Result<Value, SessionError> {
        let cookie = url_decode(&self.cookie_value)?;
        let key = self
            .key_generator
            .generate_key(COOKIE_SALT, KEY_SIZE)
            .map_err(SessionError::KeyDerivation)?;

        let parts: Vec<&str> = cookie.split(SEPARATOR).collect();
        let [data, iv, auth_tag] = parts.as_slice() else {
            return Err(SessionError::MalformedCookie(parts.len()));
        };
        let data = decode_part(data)?;
        let iv = decode_part(iv)?;
        let auth_tag = decode_part(auth_tag)?;
        if iv.len() != IV_LENGTH || auth_tag.len() != AUTH_TAG_LENGTH {
            return Err(SessionError::Decryption);
        }

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SessionError::Decryption)?;
        // The tag is expected at the end of the ciphertext
        let mut sealed = data;
        sealed.extend_from_slice(&auth_tag);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| SessionError::Decryption)?;

        let plaintext = String::from_utf8(plaintext)
            .map_err(|why| SessionError::InvalidEncoding(why.to_string()))?;
        let (message, _) = read_envelope(&plaintext).map_err(SessionError::InvalidMetadata)?;
        let session = decode_part(&message)?;
        load(&session).map_err(SessionError::Marshal)
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>, SessionError> {
    BASE64_STANDARD
        .decode(part)
        .map_err(SessionError::InvalidBase64)
}

/// Decode a form URL encoded value, where `+` is a space
fn url_decode(value: &str) -> Result<String, SessionError> {
    let mut decoded = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();
    while let Some(byte) = bytes.next() {
        match byte {
            b'+' => decoded.push(b' '),
            b'%' => {
                let high = bytes.next().and_then(hex_value);
                let low = bytes.next().and_then(hex_value);
                match (high, low) {
                    (Some(high), Some(low)) => decoded.push((high << 4) | low),
                    _ => {
                        return Err(SessionError::InvalidEncoding(
                            "incomplete percent escape".to_string(),
                        ))
                    }
                }
            }
            _ => decoded.push(byte),
        }
    }
    String::from_utf8(decoded).map_err(|why| SessionError::InvalidEncoding(why.to_string()))
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|value| value as u8)
}
