use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use formdata_upload::{BinaryPayload, FieldValue, FormData};
use serde_json::Value;

/// One `--form` argument.
///
/// - `key=value` sends text (a base64 data URL is sent as a file)
/// - `key:=json` sends the JSON document serialized
/// - `key=@path[;type=mime]` sends a file
#[derive(Debug, Clone, PartialEq)]
pub enum FormArg {
    Text { key: String, value: String },
    Json { key: String, value: Value },
    File { key: String, path: PathBuf, mime_type: Option<String> },
}

impl FromStr for FormArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let eq = s
            .find('=')
            .ok_or_else(|| format!("expected key=value, key:=json or key=@file, got '{s}'"))?;

        if eq > 0 && s.as_bytes()[eq - 1] == b':' {
            let key = &s[..eq - 1];
            let value = serde_json::from_str(&s[eq + 1..])
                .map_err(|e| format!("invalid JSON for field '{key}': {e}"))?;
            return Ok(FormArg::Json {
                key: non_empty_key(key)?,
                value,
            });
        }

        let key = non_empty_key(&s[..eq])?;
        let value = &s[eq + 1..];
        match value.strip_prefix('@') {
            Some(file) => {
                let (path, mime_type) = match file.split_once(";type=") {
                    Some((path, mime)) => (path, Some(mime.to_string())),
                    None => (file, None),
                };
                Ok(FormArg::File {
                    key,
                    path: PathBuf::from(path),
                    mime_type,
                })
            }
            None => Ok(FormArg::Text {
                key,
                value: value.to_string(),
            }),
        }
    }
}

fn non_empty_key(key: &str) -> Result<String, String> {
    if key.is_empty() {
        Err("field name cannot be empty".to_string())
    } else {
        Ok(key.to_string())
    }
}

/// `Name: value`
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Bare numbers are milliseconds, anything else goes through humantime.
pub fn parse_timeout(s: &str) -> Result<Duration, String> {
    let duration = match s.parse::<u64>() {
        Ok(millis) => Duration::from_millis(millis),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

pub fn guess_mime_type(path: &std::path::Path) -> mime::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

pub fn read_payload(path: &std::path::Path, mime_type: Option<&str>) -> Result<BinaryPayload> {
    let bytes = fs::read(path).with_context(|| format!("Unable to read {}", path.display()))?;
    let mime_type = match mime_type {
        Some(mime_type) => {
            mime_type
                .parse::<mime::Mime>()
                .map_err(|e| anyhow!("Invalid MIME type '{mime_type}': {e}"))?;
            mime_type.to_string()
        }
        None => guess_mime_type(path).essence_str().to_string(),
    };
    Ok(BinaryPayload::new(mime_type, bytes))
}

/// Appends the command line fields to `form`, in the order given.
pub fn extend_form(form: &mut FormData, args: Vec<FormArg>) -> Result<()> {
    for arg in args {
        match arg {
            FormArg::Text { key, value } => form.insert(key, value),
            FormArg::Json { key, value } => match FieldValue::from_json(value) {
                Some(value) => form.insert(key, value),
                None => bail!("Field '{key}' cannot be null"),
            },
            FormArg::File {
                key,
                path,
                mime_type,
            } => form.insert(key, read_payload(&path, mime_type.as_deref())?),
        }
    }
    Ok(())
}
