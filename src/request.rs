use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Result, UploadError};
use crate::field::FormData;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Options for a single upload, as handed over by the platform adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub form_data: FormData,
    /// Milliseconds. [`DEFAULT_TIMEOUT_MS`] when absent.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl UploadRequest {
    pub fn new(url: impl Into<String>, form_data: FormData) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            form_data,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Checks the invariants that must hold before any network activity.
    pub fn validate(&self) -> Result<Url> {
        if self.url.trim().is_empty() {
            return Err(UploadError::InvalidRequest(
                "URL and formData are required".to_string(),
            ));
        }
        if self.timeout == Some(0) {
            return Err(UploadError::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Url::parse(&self.url)
            .map_err(|e| UploadError::InvalidRequest(format!("invalid URL '{}': {e}", self.url)))
    }
}
