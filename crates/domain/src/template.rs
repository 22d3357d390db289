//! Per-application bootstrap templates consumed by Preparr.
//!
//! A template is kept as the order-preserving JSON object it was read from.
//! The keys the credential wiring cares about (`apiKey`, `applications`,
//! each entry's `name`/`fields`, each field's `name`/`value`) are reached
//! through borrowed views, and rewrites happen in place, so every object
//! keeps its source key order and untouched values re-serialize as written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key of the API key, both at the top level and as a field name.
pub const API_KEY_FIELD: &str = "apiKey";
/// JSON key of the downstream application list.
pub const APPLICATIONS_FIELD: &str = "applications";
/// JSON key of an entry or field name.
pub const NAME_FIELD: &str = "name";
/// JSON key of an entry's field list.
pub const FIELDS_FIELD: &str = "fields";
/// JSON key of a field value.
pub const VALUE_FIELD: &str = "value";

/// Bootstrap configuration for one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppConfigTemplate {
    document: Map<String, Value>,
}

impl AppConfigTemplate {
    /// Parse a template from JSON text. The document must be an object.
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Wrap an already parsed object.
    #[must_use]
    pub const fn from_map(document: Map<String, Value>) -> Self {
        Self { document }
    }

    /// The underlying object, in source key order.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Unwrap into the underlying object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.document
    }

    /// The API key currently set, when it is a string.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.document.get(API_KEY_FIELD).and_then(Value::as_str)
    }

    /// Overwrite the top-level API key whatever it held before.
    ///
    /// An existing key keeps its position; a missing one is appended.
    pub fn set_api_key(&mut self, key: &str) {
        self.document
            .insert(API_KEY_FIELD.to_string(), Value::String(key.to_string()));
    }

    /// Object entries of `applications`, when it is an array.
    pub fn applications(&self) -> impl Iterator<Item = ApplicationEntry<'_>> {
        self.document
            .get(APPLICATIONS_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|raw| ApplicationEntry { raw })
    }

    /// Raw `applications` value for in-place rewriting.
    pub(crate) fn applications_mut(&mut self) -> Option<&mut Value> {
        self.document.get_mut(APPLICATIONS_FIELD)
    }

    /// The template as a JSON value, for embedding into Helm values.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

/// Read view of a downstream application entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplicationEntry<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> ApplicationEntry<'a> {
    /// Entry name when it is a string (`Sonarr`, `Radarr`, ...).
    #[must_use]
    pub fn name(self) -> Option<&'a str> {
        self.raw.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Object entries of `fields`, when it is an array.
    pub fn fields(self) -> impl Iterator<Item = FieldEntry<'a>> {
        self.raw
            .get(FIELDS_FIELD)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|raw| FieldEntry { raw })
    }

    /// The entry object as written.
    #[must_use]
    pub const fn as_map(self) -> &'a Map<String, Value> {
        self.raw
    }
}

/// Read view of a `{name, value}` field inside an application entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldEntry<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> FieldEntry<'a> {
    /// Field name when it is a string.
    #[must_use]
    pub fn name(self) -> Option<&'a str> {
        self.raw.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Field value; `None` when the key is absent, `Some(Null)` for `null`.
    #[must_use]
    pub fn value(self) -> Option<&'a Value> {
        self.raw.get(VALUE_FIELD)
    }

    /// True when this field carries an API key.
    #[must_use]
    pub fn is_api_key(self) -> bool {
        is_api_key_field(self.raw)
    }
}

/// True when a field object is named `apiKey`.
pub(crate) fn is_api_key_field(field: &Map<String, Value>) -> bool {
    field.get(NAME_FIELD).and_then(Value::as_str) == Some(API_KEY_FIELD)
}
