use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::collection::Collection;

/// System fields that are stamped by the service, never taken from API input
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Identity and timestamps shared by every stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meta {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised while turning API input into a typed record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(String),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
    #[error("{message}")]
    Invalid { field: String, message: String },
}

impl RecordError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        RecordError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field, when the error is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            RecordError::SystemFieldNotAllowed(f) | RecordError::MissingRequiredField(f) => Some(f),
            RecordError::Invalid { field, .. } => Some(field),
            RecordError::InvalidJson(_) => None,
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(error: serde_json::Error) -> Self {
        let message = error.to_string();
        // serde reports "missing field `name` at line 1 column 2"
        if let Some(rest) = message.strip_prefix("missing field `") {
            if let Some(end) = rest.find('`') {
                return RecordError::MissingRequiredField(rest[..end].to_string());
            }
        }
        RecordError::InvalidJson(message)
    }
}

/// A typed document stored in one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;
    /// Human name used in messages, e.g. "Student"
    const LABEL: &'static str;

    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;

    fn id(&self) -> Uuid {
        self.meta().id
    }

    /// Fields silently dropped from create/update bodies: derived values and
    /// links maintained by dedicated operations.
    fn managed_fields() -> &'static [&'static str] {
        &[]
    }

    /// Recalculate derived fields.
    fn recompute(&mut self) {}

    fn validate(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

fn input_object(input: Value) -> Result<Map<String, Value>, RecordError> {
    match input {
        Value::Object(map) => Ok(map),
        _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
    }
}

fn clean_input<T: Entity>(input: Value) -> Result<Map<String, Value>, RecordError> {
    let mut map = input_object(input)?;
    if let Some(field) = SYSTEM_FIELDS.iter().find(|f| map.contains_key(**f)) {
        return Err(RecordError::SystemFieldNotAllowed(field.to_string()));
    }
    for field in T::managed_fields() {
        map.remove(*field);
    }
    Ok(map)
}

fn finish<T: Entity>(map: Map<String, Value>) -> Result<T, RecordError> {
    let mut record: T = serde_json::from_value(Value::Object(map))?;
    record.recompute();
    record.validate()?;
    Ok(record)
}

/// Build a new record from a create body. Stamps fresh system fields.
pub fn from_api_input<T: Entity>(input: Value) -> Result<T, RecordError> {
    let mut map = clean_input::<T>(input)?;
    if let Value::Object(meta) = serde_json::to_value(Meta::new())? {
        map.extend(meta);
    }
    finish(map)
}

/// Merge an update body over an existing record. Top-level fields in the
/// patch replace the stored ones; everything else is kept.
pub fn apply_patch<T: Entity>(current: &T, patch: Value) -> Result<T, RecordError> {
    let patch = clean_input::<T>(patch)?;
    let mut map = input_object(serde_json::to_value(current)?)?;
    map.extend(patch);

    let mut record: T = finish(map)?;
    record.meta_mut().touch();
    Ok(record)
}

/// Decode a stored document. Missing or malformed documents are storage errors.
pub fn decode<T: Entity>(document: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(document)
}

/// Require a non-empty trimmed string.
pub fn require_text(field: &str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        Err(RecordError::MissingRequiredField(field.to_string()))
    } else {
        Ok(())
    }
}

/// Require `end` to not precede `start`.
pub fn require_ordered_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), RecordError> {
    if end < start {
        Err(RecordError::invalid("endDate", "End date must be after start date"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Widget {
        #[serde(flatten)]
        meta: Meta,
        name: String,
        #[serde(default)]
        label: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Entity for Widget {
        const COLLECTION: Collection = Collection::Subjects;
        const LABEL: &'static str = "Widget";

        fn meta(&self) -> &Meta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut Meta {
            &mut self.meta
        }
        fn managed_fields() -> &'static [&'static str] {
            &["label", "tags"]
        }
        fn recompute(&mut self) {
            self.label = self.name.to_uppercase();
        }
        fn validate(&self) -> Result<(), RecordError> {
            require_text("name", &self.name)
        }
    }

    #[test]
    fn create_stamps_meta_and_recomputes() {
        let w: Widget = from_api_input(json!({"name": "chalk", "label": "ignored", "tags": ["x"]})).unwrap();
        assert_eq!(w.label, "CHALK");
        assert!(w.tags.is_empty());
        assert_eq!(w.meta.created_at, w.meta.updated_at);
    }

    #[test]
    fn rejects_system_fields_and_bad_shapes() {
        let err = from_api_input::<Widget>(json!({"name": "a", "id": "x"})).unwrap_err();
        assert!(matches!(err, RecordError::SystemFieldNotAllowed(ref f) if f == "id"));

        let err = from_api_input::<Widget>(json!({"label": "a"})).unwrap_err();
        assert!(matches!(err, RecordError::MissingRequiredField(ref f) if f == "name"));

        let err = from_api_input::<Widget>(json!(["name"])).unwrap_err();
        assert!(matches!(err, RecordError::InvalidJson(_)));

        let err = from_api_input::<Widget>(json!({"name": "  "})).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn patch_keeps_identity_and_unmentioned_fields() {
        let original: Widget = from_api_input(json!({"name": "chalk"})).unwrap();
        let patched = apply_patch(&original, json!({"name": "duster", "tags": ["y"]})).unwrap();

        assert_eq!(patched.meta.id, original.meta.id);
        assert_eq!(patched.meta.created_at, original.meta.created_at);
        assert!(patched.meta.updated_at >= original.meta.updated_at);
        assert_eq!(patched.label, "DUSTER");
        assert!(patched.tags.is_empty());

        assert!(apply_patch(&original, json!({"createdAt": "2020-01-01T00:00:00Z"})).is_err());
    }
}
