/*!
 Errors that can happen when loading Ruby `Marshal` data.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
    str::Utf8Error,
};

use base64::DecodeError;

/// The outer or inner encoding that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The base64 text wrapping the stream is invalid
    Base64(DecodeError),
    /// A string or symbol payload is not valid UTF-8
    Utf8(Utf8Error),
}

impl Display for EncodingError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            EncodingError::Base64(why) => write!(fmt, "invalid base64: {why}"),
            EncodingError::Utf8(why) => write!(fmt, "invalid UTF-8: {why}"),
        }
    }
}

/// Errors that can happen when loading `Marshal` data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// The stream ended at the given offset while reading the given number of bytes
    UnexpectedEndOfInput(usize, usize),
    /// The stream does not start with the `4.8` version header
    UnsupportedVersion(u8, u8),
    /// A type tag at the given offset is not part of the format
    UnsupportedType(u8, usize),
    /// A class or attribute name slot held something other than a symbol
    UnexpectedType(&'static str, u8, usize),
    /// A symbol link pointed past the end of the symbol table
    InvalidSymbolLink(i64, usize),
    /// A length prefix at the given offset is negative or cannot be addressed
    InvalidLength(i64, usize),
    /// Values were nested deeper than the reader allows
    ExcessiveNesting(usize),
    InvalidEncoding(EncodingError),
}

impl Display for MarshalError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            MarshalError::UnexpectedEndOfInput(idx, needed) => {
                write!(fmt, "Unexpected end of data reading {needed} byte(s) at {idx:#x}!")
            }
            MarshalError::UnsupportedVersion(major, minor) => {
                write!(fmt, "Unsupported Marshal version {major}.{minor}, expected 4.8!")
            }
            MarshalError::UnsupportedType(byte, idx) => {
                write!(fmt, "Unsupported Marshal type {byte:#04x} at {idx:#x}!")
            }
            MarshalError::UnexpectedType(expected, byte, idx) => {
                write!(fmt, "Expected {expected} at {idx:#x} but got {byte:#04x}!")
            }
            MarshalError::InvalidSymbolLink(link, len) => {
                write!(fmt, "Invalid symbol link {link}, only {len} symbol(s) seen!")
            }
            MarshalError::InvalidLength(length, idx) => {
                write!(fmt, "Invalid length {length} at {idx:#x}!")
            }
            MarshalError::ExcessiveNesting(limit) => {
                write!(fmt, "Values are nested deeper than {limit} levels!")
            }
            MarshalError::InvalidEncoding(why) => write!(fmt, "Failed to decode data: {why}"),
        }
    }
}

impl error::Error for MarshalError {}
