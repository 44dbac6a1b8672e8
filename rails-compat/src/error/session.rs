/*!
 Errors that can happen when decrypting a Rails session cookie.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
};

use base64::DecodeError;

use crate::error::{
    key_generator::KeyGeneratorError, marshal::MarshalError, message_verifier::VerifierError,
};

/// Errors that can happen when decrypting a Rails session cookie
#[derive(Debug)]
pub enum SessionError {
    /// The cookie is not `data--iv--tag`; the payload is the number of parts found
    MalformedCookie(usize),
    /// A percent escape or base64 part of the cookie is invalid
    InvalidEncoding(String),
    InvalidBase64(DecodeError),
    KeyDerivation(KeyGeneratorError),
    /// The key, IV, or authentication tag did not match the ciphertext
    Decryption,
    InvalidMetadata(VerifierError),
    Marshal(MarshalError),
}

impl Display for SessionError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            SessionError::MalformedCookie(parts) => {
                write!(fmt, "Cookie has {parts} part(s), expected 3!")
            }
            SessionError::InvalidEncoding(why) => write!(fmt, "Cookie is not URL encoded: {why}"),
            SessionError::InvalidBase64(why) => write!(fmt, "Cookie is not base64: {why}"),
            SessionError::KeyDerivation(why) => write!(fmt, "Unable to derive cookie key: {why}"),
            SessionError::Decryption => write!(fmt, "Unable to decrypt cookie!"),
            SessionError::InvalidMetadata(why) => write!(fmt, "{why}"),
            SessionError::Marshal(why) => write!(fmt, "Unable to load session: {why}"),
        }
    }
}

impl error::Error for SessionError {}
