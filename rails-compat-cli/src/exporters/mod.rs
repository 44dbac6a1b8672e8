pub mod exporter;
pub mod json;
pub mod txt;

pub use exporter::Exporter;
pub use json::JSON;
pub use txt::TXT;
