use kin_core::enums::{ActionKind, EntityKind};
use kin_db::repos::AuditFilter;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AuditArgs;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `kin audit`.
pub async fn handle(args: &AuditArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<bool> {
    let filter = build_filter(args, flags)?;
    let entries = ctx.service.query_audit(&filter).await?;
    output(&entries, flags.format)?;
    Ok(true)
}

fn build_filter(args: &AuditArgs, flags: &GlobalFlags) -> anyhow::Result<AuditFilter> {
    Ok(AuditFilter {
        entity_kind: args
            .entity_kind
            .as_deref()
            .map(|value| parse_enum::<EntityKind>(value, "entity-kind"))
            .transpose()?,
        subject_id: args.subject.clone(),
        actor_id: args.by.clone(),
        action_kind: args
            .action
            .as_deref()
            .map(|value| parse_enum::<ActionKind>(value, "action"))
            .transpose()?,
        batch_id: args.batch.clone(),
        group_id: args.group.clone(),
        undone: args.undone,
        limit: Some(effective_limit(flags.limit, 50)),
    })
}
