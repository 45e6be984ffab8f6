//! Error types for chapterize operations.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while extracting or normalizing a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid MOBI: {0}")]
    InvalidMobi(String),

    #[error("Invalid FB2: {0}")]
    InvalidFb2(String),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF is encrypted")]
    EncryptedPdf,

    #[error("PDF backend unavailable: {0}")]
    PdfBackendUnavailable(String),

    #[error("Conversion tool unavailable: {0}")]
    ConversionToolUnavailable(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// The declared format tag is outside the supported set.
    UnsupportedFormat,
    /// The bytes could not be parsed as the declared format.
    ExtractionFailure,
    /// The external converter is missing, failed, or timed out.
    ConversionToolUnavailable,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::ConversionToolUnavailable(_) => ErrorKind::ConversionToolUnavailable,
            _ => ErrorKind::ExtractionFailure,
        }
    }

    /// Whether the pipeline may absorb this error into a placeholder chapter.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::UnsupportedFormat
    }
}

/// Non-fatal condition reported alongside a normalized book.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DiagnosticKind {
    /// Extraction failed and a placeholder chapter was substituted.
    ExtractionFailure,
    /// The external converter could not be used; a degraded path ran instead.
    ConversionToolUnavailable,
    /// No candidate encoding decoded cleanly; Windows-1252 was forced.
    EncodingDetectionExhausted,
    /// The preferred backend for a format could not be loaded.
    PrimaryBackendUnavailable,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::ConversionToolUnavailable => DiagnosticKind::ConversionToolUnavailable,
            _ => DiagnosticKind::ExtractionFailure,
        };
        Diagnostic::new(kind, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
