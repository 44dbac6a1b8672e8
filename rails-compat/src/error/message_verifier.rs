/*!
 Errors that can happen when reading a signed message whose signature is valid.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
    string::FromUtf8Error,
};

use base64::DecodeError;

/// Errors that can happen when reading the body of a correctly signed message
#[derive(Debug)]
pub enum VerifierError {
    InvalidBase64(DecodeError),
    InvalidUtf8(FromUtf8Error),
    InvalidJson(json::Error),
    /// The JSON is missing the `_rails` envelope or one of its fields
    MissingField(&'static str),
}

impl Display for VerifierError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            VerifierError::InvalidBase64(why) => write!(fmt, "Message is not base64: {why}"),
            VerifierError::InvalidUtf8(why) => write!(fmt, "Message is not text: {why}"),
            VerifierError::InvalidJson(why) => write!(fmt, "Message metadata is not JSON: {why}"),
            VerifierError::MissingField(field) => {
                write!(fmt, "Message metadata has no `{field}` field!")
            }
        }
    }
}

impl error::Error for VerifierError {}
