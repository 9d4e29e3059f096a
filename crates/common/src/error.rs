//! Error types and the diagnostic sink shared across vidmode crates.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Top-level error type for display and video mode operations.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("The display adapter is not initialized")]
    NotInitialized,

    #[error("{call} failed with error code {code}")]
    Os { call: &'static str, code: i32 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DisplayError.
pub type DisplayResult<T> = Result<T, DisplayError>;

impl DisplayError {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// A native call returned a non-success status code.
    pub fn os(call: &'static str, code: i32) -> Self {
        Self::Os { call, code }
    }

    /// Diagnostic category used when this error is reported to an [`ErrorSink`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::Config { .. } | Self::FileNotFound { .. } | Self::Json(_) => ErrorKind::Config,
            Self::Platform { .. } | Self::Os { .. } | Self::Io(_) | Self::Other(_) => {
                ErrorKind::PlatformError
            }
        }
    }
}

/// Category of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PlatformError,
    InvalidValue,
    NotInitialized,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlatformError => "platform error",
            Self::InvalidValue => "invalid value",
            Self::NotInitialized => "not initialized",
            Self::Config => "configuration error",
        };
        f.write_str(name)
    }
}

/// Receiver for non-fatal diagnostics.
///
/// Reporting never alters control flow; the operation that reported also
/// returns its own result to the immediate caller.
pub trait ErrorSink {
    fn report(&self, kind: ErrorKind, message: &str);

    fn report_error(&self, error: &DisplayError) {
        self.report(error.kind(), &error.to_string());
    }
}

/// Default sink: emits every diagnostic as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, kind: ErrorKind, message: &str) {
        tracing::warn!(%kind, "{message}");
    }
}

/// Sink that keeps every diagnostic in memory.
///
/// Clones share the same buffer, so one handle can be given to the adapter
/// while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Rc<RefCell<Vec<(ErrorKind, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(ErrorKind, String)> {
        self.reports.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.reports.borrow_mut().clear();
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, kind: ErrorKind, message: &str) {
        self.reports.borrow_mut().push((kind, message.to_string()));
    }
}
