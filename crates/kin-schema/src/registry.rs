//! Central schema registry for Kin types.
//!
//! The `SchemaRegistry` builds JSON Schemas from kin-core types at construction
//! time using [`schemars::schema_for!`] and provides validation via `jsonschema`.

use std::collections::HashMap;

use kin_core::enums::EntityKind;
use schemars::schema_for;

use crate::error::SchemaError;

/// Central store of the JSON Schemas used by the engine.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

/// Insert a schema into the map, converting the `schemars` output to a
/// `serde_json::Value`. Panics if `serde_json::to_value` fails (should be
/// infallible for valid `schemars` output).
macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert($name, serde_json::to_value(schema_for!($ty)).unwrap());
    };
}

/// Registry name of the `before_snapshot` schema for an entity kind.
#[must_use]
pub const fn snapshot_schema_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Profile => "profile_snapshot",
        EntityKind::Relationship => "relationship_snapshot",
    }
}

impl SchemaRegistry {
    /// Build a new registry containing entity, snapshot, and response schemas.
    ///
    /// # Panics
    ///
    /// Panics if `serde_json::to_value` fails on any `schemars`-generated
    /// schema. This is not expected in practice because `schemars` always
    /// produces valid JSON-serialisable output.
    #[must_use]
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        // --- Entities (4) ---
        register!(schemas, "profile", kin_core::entities::Profile);
        register!(schemas, "relationship", kin_core::entities::Relationship);
        register!(schemas, "actor", kin_core::entities::Actor);
        register!(schemas, "audit_entry", kin_core::entities::AuditEntry);

        // --- Snapshots (3) ---
        register!(
            schemas,
            "profile_snapshot",
            kin_core::snapshot::ProfileSnapshot
        );
        register!(
            schemas,
            "relationship_snapshot",
            kin_core::snapshot::RelationshipSnapshot
        );
        register!(schemas, "undo_metadata", kin_core::snapshot::UndoMetadata);

        // --- Responses (3) ---
        register!(schemas, "undo_response", kin_core::responses::UndoResponse);
        register!(
            schemas,
            "permission_response",
            kin_core::responses::PermissionResponse
        );
        register!(schemas, "error_payload", kin_core::responses::ErrorPayload);

        Self { schemas }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Validate a `before_snapshot` for the given entity kind.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaRegistry::validate`].
    pub fn validate_snapshot(
        &self,
        kind: EntityKind,
        snapshot: &serde_json::Value,
    ) -> Result<(), SchemaError> {
        self.validate(snapshot_schema_name(kind), snapshot)
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[test]
    fn registry_has_expected_count() {
        // 4 entities + 3 snapshot shapes + 3 responses
        assert_eq!(registry().schema_count(), 10);
    }

    #[test]
    fn registry_list_is_sorted() {
        let names = registry().list();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn snapshot_names_are_registered() {
        let reg = registry();
        for kind in [EntityKind::Profile, EntityKind::Relationship] {
            assert!(reg.get(snapshot_schema_name(kind)).is_some());
        }
    }

    #[test]
    fn profile_snapshot_without_version_fails() {
        let result = registry().validate_snapshot(EntityKind::Profile, &json!({"display_name": "X"}));
        match result {
            Err(SchemaError::ValidationFailed { errors }) => assert!(!errors.is_empty()),
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn profile_snapshot_with_extras_passes() {
        let snapshot = json!({
            "version": 1,
            "display_name": "X",
            "deleted": false,
            "updated_at": "2026-01-01T00:00:00Z"
        });
        assert!(registry().validate_snapshot(EntityKind::Profile, &snapshot).is_ok());
    }

    #[test]
    fn relationship_snapshot_checks_kind() {
        let reg = registry();
        assert!(
            reg.validate_snapshot(EntityKind::Relationship, &json!({"version": 0, "kind": "sibling"}))
                .is_ok()
        );
        assert!(
            reg.validate_snapshot(EntityKind::Relationship, &json!({"version": 0, "kind": 12}))
                .is_err()
        );
    }

    #[test]
    fn unknown_schema_is_not_found() {
        let result = registry().validate("bogus", &json!({}));
        assert!(matches!(result, Err(SchemaError::NotFound(_))));
    }
}
