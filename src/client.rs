use std::{collections::BTreeMap, time::Duration};

use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart::{Form, Part},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, UploadError};
use crate::field::{self, CanonicalPart, PartContent};
use crate::request::UploadRequest;
use crate::response::{self, UploadResponse};

pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Sends normalized form data as `multipart/form-data` POST requests.
///
/// Calls share nothing but the underlying `reqwest::Client`, which is
/// configured to keep no idle connections around between calls.
#[derive(Clone)]
pub struct UploadClient {
    client: Client,
}

impl UploadClient {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }

    /// Validates, normalizes and sends one request.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResponse> {
        let url = request.validate()?;
        let timeout = request.timeout_duration();
        let parts = field::normalize(request.form_data)?;

        self.send(parts, url, &request.headers, Some(timeout)).await
    }

    /// Performs the exchange for already normalized parts.
    ///
    /// Caller headers are applied after the multipart encoder has set its
    /// boundary-bearing `Content-Type`, so an explicit `Content-Type` from the
    /// caller wins. When `timeout` elapses the in-flight request is dropped and
    /// the call fails with [`UploadError::Timeout`]; the timer never outlives
    /// the call.
    pub async fn send(
        &self,
        parts: Vec<CanonicalPart>,
        url: Url,
        headers: &BTreeMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<UploadResponse> {
        let part_count = parts.len();
        let form = build_form(parts)?;
        let headers = build_headers(headers)?;

        debug!(%url, parts = part_count, "Starting multipart upload");

        let exchange = self.exchange(url.clone(), form, headers);

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => Err(UploadError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => exchange.await,
        };

        match &result {
            Ok(response) => info!(%url, status = response.status, "Upload completed"),
            Err(e) => warn!(%url, error = %e, "Upload did not complete"),
        }

        result
    }

    async fn exchange(&self, url: Url, form: Form, headers: HeaderMap) -> Result<UploadResponse> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .headers(headers)
            .send()
            .await?;
        read_response(response).await
    }
}

fn build_form(parts: Vec<CanonicalPart>) -> Result<Form> {
    parts
        .into_iter()
        .try_fold(Form::new(), |form, part| -> Result<Form> {
            let file_name = part.file_name();
            let form = match part.content {
                PartContent::Text(text) => form.text(part.key, text),
                PartContent::Binary(payload) => {
                    let mut body = Part::bytes(payload.bytes).mime_str(&payload.mime_type)?;
                    if let Some(file_name) = file_name {
                        body = body.file_name(file_name);
                    }
                    form.part(part.key, body)
                }
            };
            Ok(form)
        })
}

fn build_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| UploadError::InvalidRequest(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            UploadError::InvalidRequest(format!("invalid value for header '{name}': {e}"))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

async fn read_response(response: reqwest::Response) -> Result<UploadResponse> {
    let status = response.status();
    let status_text = response::status_text(
        status,
        response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|reason| reason.as_bytes()),
    );
    let headers = response::flatten_headers(response.headers());
    let content_type = response::content_type(response.headers()).map(str::to_owned);

    let body = response.bytes().await?;
    let data = response::parse_body(content_type.as_deref(), &body)?;

    Ok(UploadResponse {
        status: status.as_u16(),
        status_text,
        headers,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BinaryPayload;

    #[test]
    fn test_headers_are_forwarded_verbatim() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer test-token".to_string());
        headers.insert("X-Custom-Header".to_string(), "test-value".to_string());

        let map = build_headers(&headers).unwrap();
        assert_eq!(map["authorization"], "Bearer test-token");
        assert_eq!(map["x-custom-header"], "test-value");
    }

    #[test]
    fn test_invalid_headers_are_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("Bad Header".to_string(), "v".to_string());
        assert!(matches!(
            build_headers(&headers),
            Err(UploadError::InvalidRequest(_))
        ));

        let mut headers = BTreeMap::new();
        headers.insert("X-Ok".to_string(), "line\nbreak".to_string());
        assert!(matches!(
            build_headers(&headers),
            Err(UploadError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_form_has_boundary() {
        let parts = vec![
            CanonicalPart {
                key: "name".to_string(),
                content: PartContent::Text("x".to_string()),
            },
            CanonicalPart {
                key: "avatar".to_string(),
                content: PartContent::Binary(BinaryPayload::new("image/png", vec![1, 2, 3])),
            },
        ];

        let form = build_form(parts).unwrap();
        assert!(!form.boundary().is_empty());
    }
}
