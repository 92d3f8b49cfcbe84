//! Carrying binary payloads across a boundary that only accepts plain values.
//!
//! Hosts that cannot hand raw byte buffers to the core encode them as
//! `data:<mime>;base64,<payload>` strings; the core turns those back into a
//! [`BinaryPayload`] before building the multipart body.

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose},
};
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// Padding is optional on decode.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("expected 'data:<mime>;base64,<payload>'")]
    Malformed,
    #[error("invalid MIME type '{0}'")]
    InvalidMime(String),
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// Raw bytes plus the MIME type they should be uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl BinaryPayload {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// File extension used when naming the uploaded part.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Whether `value` is shaped like a base64 data URL.
///
/// Only the header is inspected; the payload is validated by
/// [`decode_from_bridge`].
pub fn is_data_url(value: &str) -> bool {
    let Some(rest) = value.strip_prefix(DATA_URL_PREFIX) else {
        return false;
    };
    match rest.split_once(',') {
        Some((header, _)) => header.to_ascii_lowercase().ends_with(BASE64_MARKER),
        None => false,
    }
}

pub fn encode_for_bridge(payload: &BinaryPayload) -> String {
    format!(
        "{DATA_URL_PREFIX}{}{BASE64_MARKER},{}",
        payload.mime_type,
        general_purpose::STANDARD.encode(&payload.bytes)
    )
}

pub fn decode_from_bridge(data_url: &str) -> Result<BinaryPayload, DataUrlError> {
    let (header, payload) = data_url
        .strip_prefix(DATA_URL_PREFIX)
        .and_then(|rest| rest.split_once(','))
        .ok_or(DataUrlError::Malformed)?;

    if !header.to_ascii_lowercase().ends_with(BASE64_MARKER) {
        return Err(DataUrlError::Malformed);
    }

    let declared = header.split(';').next().unwrap_or_default().trim();
    let mime_type = if declared.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        let parsed: mime::Mime = declared
            .parse()
            .map_err(|_| DataUrlError::InvalidMime(declared.to_string()))?;
        parsed.essence_str().to_string()
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT.decode(compact)?;

    Ok(BinaryPayload { mime_type, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_recognizes_base64_data_urls() {
        assert!(is_data_url(PIXEL));
        assert!(is_data_url("data:application/pdf;name=a.pdf;base64,AAAA"));
        assert!(!is_data_url("data:text/plain,hello"));
        assert!(!is_data_url("data:image/png;base64"));
        assert!(!is_data_url("hello data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_decode_then_encode_reproduces_data_url() {
        let payload = decode_from_bridge(PIXEL).unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.bytes, b"\x89PNG\r\n\x1a\n");
        assert_eq!(encode_for_bridge(&payload), PIXEL);
    }

    #[test]
    fn test_round_trip_over_every_padding_length() {
        let cases: [(&str, &[u8]); 5] = [
            ("image/jpeg", b""),
            ("image/gif", b"G"),
            ("application/pdf", b"%P"),
            ("text/plain", b"abc"),
            ("image/webp", b"RIFF\x00\xff\x10"),
        ];

        for (mime_type, bytes) in cases {
            let data_url = encode_for_bridge(&BinaryPayload::new(mime_type, bytes.to_vec()));
            let payload = decode_from_bridge(&data_url).unwrap();
            assert_eq!(payload.mime_type, mime_type);
            assert_eq!(payload.bytes, bytes);
            assert_eq!(encode_for_bridge(&payload), data_url);
        }
    }

    #[test]
    fn test_decode_accepts_missing_padding_and_line_breaks() {
        let payload = decode_from_bridge("data:text/plain;base64,aGVs\nbG8").unwrap();
        assert_eq!(payload.bytes, b"hello");
    }

    #[test]
    fn test_missing_mime_defaults_to_octet_stream() {
        let payload = decode_from_bridge("data:;base64,AQID").unwrap();
        assert_eq!(payload.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(payload.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let err = decode_from_bridge("data:image/png;base64,@@not-base64@@").unwrap_err();
        assert!(matches!(err, DataUrlError::Payload(_)));
    }

    #[test]
    fn test_bad_mime_is_rejected() {
        let err = decode_from_bridge("data:not a mime;base64,AAAA").unwrap_err();
        assert!(matches!(err, DataUrlError::InvalidMime(_)));
    }

    #[test]
    fn test_empty_payload_decodes_to_empty_bytes() {
        let payload = decode_from_bridge("data:image/jpeg;base64,").unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.extension(), "jpg");
    }
}
