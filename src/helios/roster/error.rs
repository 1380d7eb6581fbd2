use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads a directory export, writes it out, or talks to the remote store.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Raised when a column the loader depends on is absent from the header row.
    #[error("'{0}' field missing")]
    MissingColumn(String),

    /// Structural or read failure inside a delimited source, such as a row
    /// with the wrong number of fields.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] csv::Error),

    /// Structural or read failure inside a workbook source. Belongs to the
    /// same class as [`RosterError::MalformedInput`]; see
    /// [`RosterError::is_malformed_input`].
    #[error("malformed workbook: {0}")]
    MalformedWorkbook(#[from] calamine::XlsxError),

    /// Raised when required configuration is absent or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raised when two rows derive the same student email and the load
    /// rejects collisions.
    #[error("duplicate student '{0}'")]
    DuplicateStudent(String),

    /// Raised when a student references a parent the directory does not own.
    #[error("parent '{0}' is not registered in the directory")]
    ForeignParent(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a file extension maps to no known reader or writer.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// The remote store answered with a non-success status.
    #[error("remote store returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// The remote store could not be reached or its reply could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// A named base or table does not exist in the remote store.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl RosterError {
    /// True for failures reading rows out of a delimited or workbook source.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            RosterError::MalformedInput(_) | RosterError::MalformedWorkbook(_)
        )
    }
}

impl From<reqwest::Error> for RosterError {
    fn from(error: reqwest::Error) -> Self {
        RosterError::Network(error.to_string())
    }
}
