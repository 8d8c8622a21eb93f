//! Error types for image-map extraction and deck generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting an image map into a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An explicit input path was given but no such file exists.
    #[error("Source file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// No input path was given and no HTML file was found by the scan.
    #[error("No *.html file found in {} and no --input provided", .0.display())]
    NoCandidateFile(PathBuf),

    /// The HTML parsed, but no area resolved to an external link.
    #[error("No clickable area with external link found in the HTML")]
    EmptyResult,

    /// An area's `coords` attribute is not four integers.
    #[error("Malformed area coordinates: {0:?}")]
    MalformedCoordinates(String),

    /// The background image could not be read or is not a supported format.
    #[error("Image error: {0}")]
    Image(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML reading or writing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}
