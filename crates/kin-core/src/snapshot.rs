//! Snapshot payloads carried by audit entries.
//!
//! `before_snapshot` is a JSON object that must carry an integer `version`.
//! Only whitelisted fields are ever copied back onto a live entity; every
//! other key (ids, timestamps, denormalised extras) is ignored on restore.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::EntityKind;
use crate::errors::CoreError;

pub const VERSION_KEY: &str = "version";

/// Key under which undo entries carry their metadata in `after_snapshot`.
pub const UNDO_METADATA_KEY: &str = "undo";

/// Profile fields holding parent references.
pub const PARENT_REFERENCE_FIELDS: &[&str] = &["father_id", "mother_id"];

/// Storage type of a restorable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
}

/// A column that restoration is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorableField {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
}

const fn text(name: &'static str, nullable: bool) -> RestorableField {
    RestorableField {
        name,
        ty: FieldType::Text,
        nullable,
    }
}

const PROFILE_FIELDS: &[RestorableField] = &[
    text("display_name", false),
    text("birth_date", true),
    text("death_date", true),
    text("gender", true),
    text("biography", true),
    text("father_id", true),
    text("mother_id", true),
    RestorableField {
        name: "generation",
        ty: FieldType::Integer,
        nullable: true,
    },
];

const RELATIONSHIP_FIELDS: &[RestorableField] = &[
    text("kind", false),
    text("started_on", true),
    text("ended_on", true),
];

/// Whitelist of restorable fields for an entity kind.
#[must_use]
pub const fn restorable_fields(kind: EntityKind) -> &'static [RestorableField] {
    match kind {
        EntityKind::Profile => PROFILE_FIELDS,
        EntityKind::Relationship => RELATIONSHIP_FIELDS,
    }
}

fn as_object(snapshot: &Value) -> Result<&Map<String, Value>, CoreError> {
    snapshot
        .as_object()
        .ok_or_else(|| CoreError::Validation("snapshot must be a JSON object".into()))
}

fn read_version(map: &Map<String, Value>, which: &str) -> Result<Option<i64>, CoreError> {
    match map.get(VERSION_KEY) {
        None => Ok(None),
        Some(value) => match value.as_i64() {
            Some(v) if v >= 0 => Ok(Some(v)),
            _ => Err(CoreError::Validation(format!(
                "{which} version must be a non-negative integer, got {value}"
            ))),
        },
    }
}

/// Read the required `version` key of a `before_snapshot`.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the snapshot is not an object or the
/// key is missing or not a non-negative integer.
pub fn snapshot_version(snapshot: &Value) -> Result<i64, CoreError> {
    read_version(as_object(snapshot)?, "before_snapshot")?
        .ok_or_else(|| CoreError::Validation("before_snapshot is missing 'version'".into()))
}

/// The version the live entity must carry for an undo to proceed.
///
/// `after_snapshot.version` wins when present; otherwise the forward mutation
/// is assumed to have bumped `before_snapshot.version` by exactly one.
///
/// # Errors
///
/// Returns `CoreError::Validation` for a malformed version in either
/// snapshot, an `after_snapshot` that is not an object, or a
/// `before_snapshot.version` with no successor.
pub fn expected_live_version(before: &Value, after: Option<&Value>) -> Result<i64, CoreError> {
    let before_version = snapshot_version(before)?;
    if let Some(after) = after.filter(|v| !v.is_null()) {
        let map = after
            .as_object()
            .ok_or_else(|| CoreError::Validation("after_snapshot must be a JSON object".into()))?;
        if let Some(v) = read_version(map, "after_snapshot")? {
            return Ok(v);
        }
    }
    before_version.checked_add(1).ok_or_else(|| {
        CoreError::Validation(format!(
            "before_snapshot version {before_version} has no successor"
        ))
    })
}

/// Whitelisted field values extracted from a `before_snapshot`.
#[derive(Debug, Clone, PartialEq)]
pub struct Restoration {
    kind: EntityKind,
    fields: Vec<(RestorableField, Value)>,
}

impl Restoration {
    /// Extract and type-check the restorable fields present in `snapshot`.
    ///
    /// Absent keys are left untouched on restore; a present `null` clears a
    /// nullable column.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the version is missing, a value has
    /// the wrong type, or `null` is given for a non-nullable field.
    pub fn from_snapshot(kind: EntityKind, snapshot: &Value) -> Result<Self, CoreError> {
        snapshot_version(snapshot)?;
        let map = as_object(snapshot)?;

        let mut fields = Vec::new();
        for field in restorable_fields(kind) {
            let Some(value) = map.get(field.name) else {
                continue;
            };
            let ok = match (value, field.ty) {
                (Value::Null, _) => field.nullable,
                (Value::String(_), FieldType::Text) => true,
                (Value::Number(n), FieldType::Integer) => n.is_i64(),
                _ => false,
            };
            if !ok {
                return Err(CoreError::Validation(format!(
                    "{kind} snapshot field '{}' has invalid value {value}",
                    field.name
                )));
            }
            fields.push((*field, value.clone()));
        }

        Ok(Self { kind, fields })
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn fields(&self) -> impl Iterator<Item = (&RestorableField, &Value)> {
        self.fields.iter().map(|(f, v)| (f, v))
    }

    /// Non-null parent ids this restoration would write, with their field.
    #[must_use]
    pub fn parent_references(&self) -> Vec<(&'static str, &str)> {
        self.fields
            .iter()
            .filter(|(f, _)| PARENT_REFERENCE_FIELDS.contains(&f.name))
            .filter_map(|(f, v)| v.as_str().map(|id| (f.name, id)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Typed snapshot shapes (schema registration only)
// ---------------------------------------------------------------------------

/// Shape of a profile `before_snapshot`. Extra keys are permitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
}

/// Shape of a relationship `before_snapshot`. Extra keys are permitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RelationshipSnapshot {
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<crate::enums::RelationshipKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<String>,
}

/// Metadata stored under `after_snapshot.undo` on undo entries.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UndoMetadata {
    /// Entry this undo reversed.
    pub reverts: String,
    pub reason: String,
}

/// Attach undo metadata to an entity snapshot.
#[must_use]
pub fn with_undo_metadata(mut snapshot: Value, metadata: &UndoMetadata) -> Value {
    if let Value::Object(ref mut map) = snapshot {
        map.insert(
            UNDO_METADATA_KEY.to_string(),
            serde_json::json!({ "reverts": metadata.reverts, "reason": metadata.reason }),
        );
    }
    snapshot
}
