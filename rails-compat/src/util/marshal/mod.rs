/*!
 Contains logic and data structures used to load Ruby `Marshal` data into native Rust data structures.

 ## Overview

 `Marshal` is the binary object serialization format built into Ruby. Rails applications use it for
 session cookies, cache entries, and other payloads that Rust services may need to read.

 ## Features

 - Reads version 4.8 of the format, which every Ruby since 1.8 writes
 - Arbitrary-precision integers, strings, symbols, arrays, and hashes are converted to a [`Value`](models::Value)
 - Objects, user-defined serializations, and object links are kept as [`ObjectWrapper`](models::ObjectWrapper)s
 - Malformed or truncated input always fails with a [`MarshalError`], never a partial value

 ## Limitations

 - Read-only: there is no writer
 - Instance variables attached with `I`, usually the string encoding, are discarded
 - Object links (`@`) are returned as indexes and are not resolved
 - Objects extended with a module (`e`) are returned without their payload
*/

use base64::{prelude::BASE64_STANDARD, Engine};

use crate::error::marshal::{EncodingError, MarshalError};

use self::{models::Value, parser::MarshalReader};

pub mod models;
pub mod parser;
mod tests;

/// Load the value stored in some `Marshal` bytes
///
/// # Example
///
/// ```
/// use rails_compat::util::marshal::{load, models::Value};
///
/// let value = load(&[0x04, 0x08, 0x69, 0x06]).unwrap();
/// assert_eq!(value, Value::from(1));
/// ```
pub fn load(bytes: &[u8]) -> Result<Value, MarshalError> {
    MarshalReader::new(bytes).parse()
}

/// Load the value stored in base64-encoded `Marshal` bytes, as found in cookies and caches
///
/// # Example
///
/// ```
/// use rails_compat::util::marshal::load_base64;
///
/// let value = load_base64("BAhJIgthemVydHkGOgZFVA==").unwrap();
/// assert_eq!(value.as_str(), Some("azerty"));
/// ```
pub fn load_base64(text: &str) -> Result<Value, MarshalError> {
    let bytes = BASE64_STANDARD
        .decode(text)
        .map_err(|why| MarshalError::InvalidEncoding(EncodingError::Base64(why)))?;
    load(&bytes)
}
