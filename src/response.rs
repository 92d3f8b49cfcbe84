use std::collections::BTreeMap;

use reqwest::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderMap},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Json(Value),
    Text(String),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Json(_) => None,
            ResponseData::Text(text) => Some(text),
        }
    }
}

/// The outcome of a completed exchange, whatever its status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub data: ResponseData,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Lower-cased header names; repeated headers joined with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flat.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    flat
}

pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

/// JSON when the content type says so, raw text otherwise.
///
/// A body that claims to be JSON but does not parse is an error.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<ResponseData> {
    if is_json_content_type(content_type) {
        Ok(ResponseData::Json(serde_json::from_slice(body)?))
    } else {
        Ok(ResponseData::Text(String::from_utf8_lossy(body).into_owned()))
    }
}

/// The server's reason phrase when it sent a non-standard one, else the
/// canonical phrase for `status`.
pub fn status_text(status: StatusCode, reason: Option<&[u8]>) -> String {
    match reason {
        Some(reason) => String::from_utf8_lossy(reason).into_owned(),
        None => status.canonical_reason().unwrap_or_default().to_string(),
    }
}

pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use reqwest::header::{HeaderValue, SET_COOKIE};
    use serde_json::json;

    #[test]
    fn test_json_body_is_parsed() {
        let data = parse_body(Some("application/json; charset=utf-8"), br#"{"a":1}"#).unwrap();
        assert_eq!(data, ResponseData::Json(json!({"a": 1})));
    }

    #[test]
    fn test_text_body_is_kept_verbatim() {
        let data = parse_body(Some("text/plain"), b"hello").unwrap();
        assert_eq!(data.as_text(), Some("hello"));

        let data = parse_body(None, br#"{"a":1}"#).unwrap();
        assert_eq!(data.as_text(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_invalid_json_body_is_an_error() {
        let err = parse_body(Some("application/json"), b"<html>").unwrap_err();
        assert!(matches!(err, UploadError::Transport { .. }));
    }

    #[test]
    fn test_headers_are_flattened() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat["content-type"], "text/plain");
        assert_eq!(flat["set-cookie"], "a=1, b=2");
        assert_eq!(flat["x-request-id"], "abc");
        assert_eq!(content_type(&headers), Some("text/plain"));
    }

    #[test]
    fn test_status_text_prefers_server_reason() {
        let status = StatusCode::from_u16(299).unwrap();
        assert_eq!(status_text(status, Some(&b"Custom Thing"[..])), "Custom Thing");
        assert_eq!(status_text(status, None), "");
        assert_eq!(status_text(StatusCode::OK, Some(&b"Everything Fine"[..])), "Everything Fine");
        assert_eq!(status_text(StatusCode::NOT_FOUND, None), "Not Found");
    }

    #[test]
    fn test_serializes_with_adapter_field_names() {
        let response = UploadResponse {
            status: 201,
            status_text: "Created".to_string(),
            headers: BTreeMap::new(),
            data: ResponseData::Text("ok".to_string()),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"status": 201, "statusText": "Created", "headers": {}, "data": "ok"})
        );
        assert!(response.is_success());
    }
}
