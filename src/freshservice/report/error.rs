use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Error type covering the failures that can occur while querying the asset
/// service, shaping the report, or writing it out.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Wrapper for IO failures such as reading an ID file or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a response body is not the JSON we expect.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Transport level failures (DNS, TLS, connection reset, timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when the service answers with a non-success status other than 429.
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// Raised when the throttle retry bound is reached while still rate limited.
    #[error("still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Raised when the configuration cannot be turned into a usable client.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the user lookup receives fewer than two name parts.
    #[error("a first name and a last name separated by a space are required, got '{0}'")]
    InvalidName(String),

    /// Raised when the ID specification expands to nothing.
    #[error("no valid asset IDs found in the provided input")]
    NoValidIds,

    /// Raised when the output path carries an extension we cannot write.
    #[error("unsupported output format '{extension}' for {path}")]
    UnsupportedOutput { path: PathBuf, extension: String },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
