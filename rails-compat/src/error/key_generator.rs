/*!
 Errors that can happen when deriving keys from a secret.
*/

use std::{
    error,
    fmt::{Display, Formatter, Result},
};

/// Errors that can happen when deriving keys from a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGeneratorError {
    /// Key sizes are given in bits and must be a positive multiple of 8
    InvalidKeySize(usize),
    /// PBKDF2 needs at least one round
    InvalidIterations,
}

impl Display for KeyGeneratorError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            KeyGeneratorError::InvalidKeySize(bits) => {
                write!(fmt, "Key size of {bits} bits is not a positive multiple of 8!")
            }
            KeyGeneratorError::InvalidIterations => {
                write!(fmt, "Key derivation needs at least one iteration!")
            }
        }
    }
}

impl error::Error for KeyGeneratorError {}
