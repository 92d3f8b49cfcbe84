use std::fmt::{self, Display};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::bridge::{self, BinaryPayload};
use crate::error::{Result, UploadError};

/// A scalar form value, sent as its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Scalar),
    /// Objects and arrays, sent as their JSON serialization.
    Structured(Value),
    Binary(BinaryPayload),
    /// A binary payload that crossed the bridge as `data:<mime>;base64,...`.
    DataUrl(String),
}

impl FieldValue {
    /// Classifies a JSON value. `null` has no form representation and
    /// yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Text(Scalar::Bool(b))),
            Value::Number(n) => Some(FieldValue::Text(Scalar::Number(n))),
            Value::String(s) => Some(FieldValue::from(s)),
            structured @ (Value::Array(_) | Value::Object(_)) => {
                Some(FieldValue::Structured(structured))
            }
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        if bridge::is_data_url(&value) {
            FieldValue::DataUrl(value)
        } else {
            FieldValue::Text(Scalar::String(value))
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::from(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Text(Scalar::Bool(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Text(Scalar::Number(value.into()))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Text(Scalar::Number(value.into()))
    }
}

impl From<Map<String, Value>> for FieldValue {
    fn from(value: Map<String, Value>) -> Self {
        FieldValue::Structured(Value::Object(value))
    }
}

impl From<BinaryPayload> for FieldValue {
    fn from(value: BinaryPayload) -> Self {
        FieldValue::Binary(value)
    }
}

/// Named form fields in insertion order.
///
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FieldValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json_map(map: Map<String, Value>) -> Self {
        let mut form = FormData::new();
        for (key, value) in map {
            if let Some(value) = FieldValue::from_json(value) {
                form.insert(key, value);
            }
        }
        form
    }
}

impl IntoIterator for FormData {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'de> Deserialize<'de> for FormData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(FormData::from_json_map(map))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Text(String),
    Binary(BinaryPayload),
}

/// One form field resolved to the shape the transport sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPart {
    pub key: String,
    pub content: PartContent,
}

impl CanonicalPart {
    pub fn kind(&self) -> PartKind {
        match self.content {
            PartContent::Text(_) => PartKind::Text,
            PartContent::Binary(_) => PartKind::Binary,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match &self.content {
            PartContent::Text(_) => None,
            PartContent::Binary(payload) => Some(&payload.mime_type),
        }
    }

    /// `<key>.<ext>` for binary parts.
    pub fn file_name(&self) -> Option<String> {
        match &self.content {
            PartContent::Text(_) => None,
            PartContent::Binary(payload) => Some(format!("{}.{}", self.key, payload.extension())),
        }
    }
}

/// Resolves every field into a [`CanonicalPart`], keeping field order.
///
/// The only failure is a data URL whose payload does not decode; nothing is
/// returned in that case, so a bad field never leads to a partial upload.
pub fn normalize(form_data: FormData) -> Result<Vec<CanonicalPart>> {
    form_data
        .into_iter()
        .map(|(key, value)| -> Result<CanonicalPart> {
            let content = match value {
                FieldValue::Binary(payload) => PartContent::Binary(payload),
                FieldValue::DataUrl(data_url) => PartContent::Binary(
                    bridge::decode_from_bridge(&data_url)
                        .map_err(|e| UploadError::marshal(&key, e))?,
                ),
                FieldValue::Structured(value) => PartContent::Text(value.to_string()),
                FieldValue::Text(scalar) => PartContent::Text(scalar.to_string()),
            };
            Ok(CanonicalPart { key, content })
        })
        .collect()
}
