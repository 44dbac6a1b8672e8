use std::fs;

use base64::{prelude::BASE64_STANDARD, Engine};
use rails_compat::{
    action_pack::session::SessionCookie,
    active_support::message_verifier::MessageVerifier,
    error::marshal::{EncodingError, MarshalError},
    util::marshal::{models::Value, parser::MarshalReader},
};

use crate::{
    app::{
        error::RuntimeError,
        options::{ExportType, Options, Source},
    },
    exporters::{Exporter, JSON, TXT},
};

/// Stores the application state and handles application lifecycle
pub struct Config {
    /// App configuration options
    pub options: Options,
}

impl Config {
    pub fn new(options: Options) -> Self {
        Config { options }
    }

    /// Decode the selected input into a value
    ///
    /// Signed messages that fail verification become `nil`, like `MessageVerifier#verify` in Ruby.
    pub fn decode(&self) -> Result<Value, RuntimeError> {
        match &self.options.source {
            Source::Marshal(data) => {
                eprintln!("Loading Marshal data...");
                self.load_marshal(data.as_bytes(), true)
            }
            Source::File(path, base64) => {
                eprintln!("Loading Marshal data from {}...", path.display());
                let bytes =
                    fs::read(path).map_err(|err| RuntimeError::ReadError(err, path.clone()))?;
                self.load_marshal(&bytes, *base64)
            }
            Source::Cookie {
                value,
                secret_key_base,
            } => {
                eprintln!("Decrypting session cookie...");
                SessionCookie::from_cookie_value(value.as_str(), secret_key_base)
                    .decrypt()
                    .map_err(RuntimeError::SessionError)
            }
            Source::Verify {
                signed,
                secret,
                purpose,
            } => {
                eprintln!("Verifying message for {purpose}...");
                let message = MessageVerifier::new(secret)
                    .verify(signed, purpose)
                    .map_err(RuntimeError::VerifierError)?;
                if message.is_none() {
                    eprintln!("Signature or purpose does not match!");
                }
                Ok(message.map_or(Value::Nil, Value::String))
            }
            Source::Sign {
                value,
                secret,
                purpose,
            } => {
                eprintln!("Signing message for {purpose}...");
                Ok(Value::String(
                    MessageVerifier::new(secret).generate(value, purpose),
                ))
            }
        }
    }

    /// Load raw or base64 `Marshal` bytes with the configured depth limit
    fn load_marshal(&self, data: &[u8], base64: bool) -> Result<Value, RuntimeError> {
        let decoded;
        let bytes = if base64 {
            let text = std::str::from_utf8(data).map_err(|why| {
                RuntimeError::MarshalError(MarshalError::InvalidEncoding(EncodingError::Utf8(why)))
            })?;
            decoded = BASE64_STANDARD.decode(text.trim()).map_err(|why| {
                RuntimeError::MarshalError(MarshalError::InvalidEncoding(EncodingError::Base64(
                    why,
                )))
            })?;
            decoded.as_slice()
        } else {
            data
        };

        MarshalReader::with_max_depth(bytes, self.options.max_depth)
            .parse()
            .map_err(RuntimeError::MarshalError)
    }

    /// Decode the input and write it out in the selected format
    pub fn start(&self) -> Result<(), RuntimeError> {
        let value = self.decode()?;
        match self.options.export_type {
            ExportType::Txt => TXT::new(self)?.export(&value),
            ExportType::Json => JSON::new(self)?.export(&value),
        }
    }
}
