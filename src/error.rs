use thiserror::Error;

pub type Result<T> = std::result::Result<T, UploadError>;

pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Failures surfaced by an upload call.
///
/// Non-2xx HTTP statuses are not errors; they come back as a normal
/// [`UploadResponse`](crate::UploadResponse).
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request was rejected before anything was sent.
    #[error("Upload failed: {0}")]
    InvalidRequest(String),

    /// A field carried a data URL that could not be decoded.
    #[error("Upload failed: invalid data URL in field '{field}': {reason}")]
    Marshal { field: String, reason: String },

    #[error("Upload failed: request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Network failure, unparseable JSON body, or anything else below us.
    #[error("Upload failed: {reason}")]
    Transport { reason: String },
}

impl UploadError {
    pub fn marshal(field: impl Into<String>, reason: impl ToString) -> Self {
        UploadError::Marshal {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Narrows any lower-level failure into a single transport error.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        let reason = err.to_string();
        let reason = if reason.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            reason
        };
        UploadError::Transport { reason }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UploadError::Timeout { .. })
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        let mut reason = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            reason = format!("{reason}: {inner}");
            source = inner.source();
        }
        UploadError::transport(reason)
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::transport(format!("Failed to parse JSON response: {err}"))
    }
}
