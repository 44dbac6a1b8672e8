use std::{
    fs::File,
    io::{stdout, BufWriter, Write},
};

use rails_compat::util::marshal::models::{ObjectWrapper, Value};

use crate::app::{error::RuntimeError, runtime::Config};

/// Buffered handle to the export file or stdout
pub type Output = BufWriter<Box<dyn Write>>;

/// Defines behavior for writing a decoded value to the export destination
pub trait Exporter<'a> {
    /// Create a new exporter that writes where the config says to
    fn new(config: &'a Config) -> Result<Self, RuntimeError>
    where
        Self: Sized;
    /// Render the value and write it out
    fn export(&mut self, value: &Value) -> Result<(), RuntimeError>;
}

/// Defines behavior for formatting decoded values to the desired output format
pub(super) trait Writer {
    type Rendered;
    /// Format any value, nested `indent` levels deep
    fn format_value(&self, value: &Value, indent: usize) -> Self::Rendered;
    /// Format the pairs of a hash
    fn format_hash(&self, pairs: &[(Value, Value)], indent: usize) -> Self::Rendered;
    /// Format an object that was not rehydrated
    fn format_object(&self, wrapper: &ObjectWrapper, indent: usize) -> Self::Rendered;
    fn write_to_file(file: &mut Output, text: &str) -> Result<(), RuntimeError> {
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(RuntimeError::DiskError)
    }
}

/// Open the export file, or stdout when no path was given
pub(super) fn open_output(config: &Config) -> Result<Output, RuntimeError> {
    match &config.options.export_path {
        Some(path) => {
            let file =
                File::create(path).map_err(|err| RuntimeError::CreateError(err, path.clone()))?;
            Ok(BufWriter::new(Box::new(file)))
        }
        None => Ok(BufWriter::new(Box::new(stdout()))),
    }
}
