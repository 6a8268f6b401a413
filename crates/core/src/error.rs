//! Error types for flash report generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a template, loading data or writing a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (PPTX container).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error (PPTX parts).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// A part referenced by the package is missing.
    #[error("Part not found in package: {0}")]
    PartNotFound(String),

    /// The template does not have the structure the generator needs.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The portfolio data file could not be parsed.
    #[error("Invalid portfolio data: {0}")]
    DataError(String),

    /// The layout override file could not be parsed.
    #[error("Invalid layout configuration: {0}")]
    LayoutError(String),
}
