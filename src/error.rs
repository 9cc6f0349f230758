use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads, normalises, or writes a chord dictionary.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The path is missing or does not hold the shape the adapter expects.
    #[error("invalid {kind} file {path}: {reason}")]
    FileFormat {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// A row could not be turned into a chord.
    #[error("invalid value for field '{field}': {reason}")]
    Validation { field: &'static str, reason: String },

    /// A chord cannot be encoded safely in the target format.
    #[error("cannot serialise field '{field}': {reason}")]
    Serialization { field: &'static str, reason: String },

    /// Missing or unusable command line arguments.
    #[error("{0}")]
    Usage(String),

    /// Any adapter failure, annotated with the conversion that was attempted.
    #[error("conversion from {from} to {to} failed: {source}")]
    Conversion {
        from: String,
        to: String,
        #[source]
        source: Box<ToolError>,
    },

    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the embedded database engine.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors bubbled up from the spreadsheet reader implementation.
    #[error("spreadsheet read error: {0}")]
    SpreadsheetRead(#[from] calamine::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when the OpenDocument package cannot be assembled.
    #[error("ODS package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Raised when the OpenDocument content cannot be serialised.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn file_format(
        kind: &'static str,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        ToolError::FileFormat {
            kind,
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ToolError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Returns `true` when the error, or the error it annotates, is a usage error.
    pub fn is_usage(&self) -> bool {
        match self {
            ToolError::Usage(_) => true,
            ToolError::Conversion { source, .. } => source.is_usage(),
            _ => false,
        }
    }
}
