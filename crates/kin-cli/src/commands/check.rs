use kin_core::permission::UndoDecision;
use kin_core::responses::{ErrorPayload, PermissionResponse};
use kin_db::UndoError;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CheckArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `kin check`.
///
/// A missing entry or actor prints the error envelope and exits non-zero,
/// the same as a failed undo.
pub async fn handle(args: &CheckArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<bool> {
    let result = ctx
        .service
        .check_undo_permission(&args.entry_id, &args.actor)
        .await;
    match permission_outcome(result) {
        Ok(response) => {
            output(&response, flags.format)?;
            Ok(true)
        }
        Err(payload) => {
            output(&payload, flags.format)?;
            Ok(false)
        }
    }
}

fn permission_outcome(
    result: Result<UndoDecision, UndoError>,
) -> Result<PermissionResponse, ErrorPayload> {
    result
        .map(PermissionResponse::from)
        .map_err(|e| e.to_payload())
}

#[cfg(test)]
mod tests {
    use kin_config::UndoConfig;
    use kin_core::permission::DecisionReason;
    use kin_core::responses::ErrorKind;
    use kin_db::{KinDb, KinService};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cli::OutputFormat;

    async fn context() -> AppContext {
        let db = KinDb::open_local(":memory:").await.unwrap();
        AppContext {
            service: KinService::from_db(db, &UndoConfig::default()),
        }
    }

    fn flags() -> GlobalFlags {
        GlobalFlags {
            format: OutputFormat::Raw,
            limit: None,
            quiet: false,
            verbose: false,
            db: None,
        }
    }

    #[test]
    fn decision_maps_to_permission_response() {
        let decision = UndoDecision {
            can_undo: true,
            reason: DecisionReason::Owner,
        };
        let response = permission_outcome(Ok(decision)).unwrap();
        assert!(response.can_undo);
        assert_eq!(response.reason, DecisionReason::Owner);
    }

    #[test]
    fn undo_error_maps_to_error_payload() {
        let err = UndoError::NotFound {
            entity_type: "audit entry",
            id: "aud-x".into(),
        };
        let payload = permission_outcome(Err(err)).unwrap_err();
        assert_eq!(payload.kind, ErrorKind::NotFound);
        assert!(payload.message.contains("aud-x"), "{}", payload.message);
    }

    #[tokio::test]
    async fn missing_entry_exits_non_zero_without_error() {
        let ctx = context().await;
        let args = CheckArgs {
            entry_id: "aud-missing".into(),
            actor: "act-nobody".into(),
        };
        let ok = handle(&args, &ctx, &flags()).await.unwrap();
        assert!(!ok);
    }
}
