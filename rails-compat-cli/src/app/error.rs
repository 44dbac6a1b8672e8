/*!
Errors that can happen during the application's runtime
*/

use std::{
    fmt::{Display, Formatter, Result},
    io::Error as IoError,
    path::PathBuf,
};

use rails_compat::error::{
    marshal::MarshalError, message_verifier::VerifierError, session::SessionError,
};

/// Errors that can happen during the application's runtime
#[derive(Debug)]
pub enum RuntimeError {
    InvalidOptions(String),
    /// An input file could not be read
    ReadError(IoError, PathBuf),
    /// The export file could not be created
    CreateError(IoError, PathBuf),
    DiskError(IoError),
    MarshalError(MarshalError),
    SessionError(SessionError),
    VerifierError(VerifierError),
}

impl Display for RuntimeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            RuntimeError::InvalidOptions(why) => write!(fmt, "Invalid options!\n{why}"),
            RuntimeError::ReadError(why, path) => write!(fmt, "{why}: {path:?}"),
            RuntimeError::CreateError(why, path) => write!(fmt, "{why}: {path:?}"),
            RuntimeError::DiskError(why) => write!(fmt, "{why}"),
            RuntimeError::MarshalError(why) => write!(fmt, "{why}"),
            RuntimeError::SessionError(why) => write!(fmt, "{why}"),
            RuntimeError::VerifierError(why) => write!(fmt, "{why}"),
        }
    }
}
