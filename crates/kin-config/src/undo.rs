//! Undo policy windows and reason limits.

use kin_core::permission::UndoPolicy;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_update_window_days() -> i64 {
    30
}

const fn default_delete_window_days() -> i64 {
    7
}

const fn default_relationship_window_days() -> i64 {
    14
}

const fn default_max_reason_chars() -> usize {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UndoConfig {
    /// Days a non-admin may undo their own (or their branch's) edits.
    #[serde(default = "default_update_window_days")]
    pub update_window_days: i64,

    /// Days any role may undo a delete or cascade delete.
    #[serde(default = "default_delete_window_days")]
    pub delete_window_days: i64,

    #[serde(default = "default_relationship_window_days")]
    pub relationship_create_window_days: i64,

    #[serde(default = "default_relationship_window_days")]
    pub relationship_delete_window_days: i64,

    /// Undo reasons are truncated to this many characters.
    #[serde(default = "default_max_reason_chars")]
    pub max_reason_chars: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            update_window_days: default_update_window_days(),
            delete_window_days: default_delete_window_days(),
            relationship_create_window_days: default_relationship_window_days(),
            relationship_delete_window_days: default_relationship_window_days(),
            max_reason_chars: default_max_reason_chars(),
        }
    }
}

impl UndoConfig {
    /// Check that every window is non-negative and the reason cap is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("undo.update_window_days", self.update_window_days),
            ("undo.delete_window_days", self.delete_window_days),
            (
                "undo.relationship_create_window_days",
                self.relationship_create_window_days,
            ),
            (
                "undo.relationship_delete_window_days",
                self.relationship_delete_window_days,
            ),
        ];
        for (field, days) in windows {
            if days < 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: format!("window must be zero or more days, got {days}"),
                });
            }
        }
        if self.max_reason_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "undo.max_reason_chars".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The permission windows as a core policy.
    #[must_use]
    pub const fn policy(&self) -> UndoPolicy {
        UndoPolicy {
            update_window_days: self.update_window_days,
            delete_window_days: self.delete_window_days,
            relationship_create_window_days: self.relationship_create_window_days,
            relationship_delete_window_days: self.relationship_delete_window_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_core_policy() {
        let config = UndoConfig::default();
        assert_eq!(config.policy(), UndoPolicy::default());
        assert_eq!(config.max_reason_chars, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_reason_cap_is_rejected() {
        let config = UndoConfig {
            max_reason_chars: 0,
            ..UndoConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("undo.max_reason_chars"));
    }

    #[test]
    fn negative_window_is_rejected() {
        let config = UndoConfig {
            delete_window_days: -1,
            ..UndoConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("undo.delete_window_days"));
    }
}
