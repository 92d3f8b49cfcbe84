//! Multipart form submission for hosts that hand over loosely typed fields.
//!
//! A call goes through two steps:
//!
//! - [`normalize`] resolves each [`FieldValue`] into a [`CanonicalPart`],
//!   decoding base64 data URLs into binary parts.
//! - [`UploadClient::send`] builds the `multipart/form-data` body, POSTs it
//!   under a timeout and returns an [`UploadResponse`] with the body parsed
//!   as JSON or kept as text.
//!
//! ```no_run
//! use formdata_upload::{FormData, UploadRequest, upload_form_data};
//! use serde_json::json;
//!
//! # async fn run() -> formdata_upload::Result<()> {
//! let form = FormData::new()
//!     .with("name", "x")
//!     .with("meta", json!({"k": 1}).as_object().cloned().unwrap_or_default())
//!     .with("avatar", "data:image/png;base64,iVBORw0KGgo=");
//!
//! let request = UploadRequest::new("https://example.test/post", form)
//!     .header("Authorization", "Bearer token")
//!     .timeout_ms(5000);
//!
//! let response = upload_form_data(request).await?;
//! println!("{} {}", response.status, response.status_text);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod client;
pub mod error;
pub mod field;
pub mod request;
pub mod response;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use bridge::{BinaryPayload, decode_from_bridge, encode_for_bridge};
pub use client::UploadClient;
pub use error::{Result, UploadError};
pub use field::{CanonicalPart, FieldValue, FormData, PartContent, PartKind, Scalar, normalize};
pub use request::{DEFAULT_TIMEOUT_MS, UploadRequest};
pub use response::{ResponseData, UploadResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub value: String,
}

/// Returns its input unchanged. Used by adapters to check the wiring.
pub fn echo(value: impl Into<String>) -> Echo {
    let value = value.into();
    info!(%value, "Echo");
    Echo { value }
}

/// Normalizes and sends a single request with a fresh client.
pub async fn upload_form_data(request: UploadRequest) -> Result<UploadResponse> {
    UploadClient::new()?.upload(request).await
}
