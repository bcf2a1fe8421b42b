use kin_db::undo::respond;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::UndoCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `kin undo`.
///
/// Undo failures are part of the response envelope, not CLI errors: the
/// envelope is printed and the exit code is non-zero.
pub async fn handle(
    action: &UndoCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    let svc = &ctx.service;
    let result = match action {
        UndoCommands::Update(a) => svc.undo_update(&a.id, &a.actor, &a.reason).await,
        UndoCommands::Delete(a) => svc.undo_delete(&a.id, &a.actor, &a.reason).await,
        UndoCommands::Cascade(a) => svc.undo_cascade_delete(&a.id, &a.actor, &a.reason).await,
        UndoCommands::Relationship(a) => {
            svc.undo_relationship_create(&a.id, &a.actor, &a.reason)
                .await
        }
        UndoCommands::Entry(a) => svc.undo_entry(&a.id, &a.actor, &a.reason).await,
        UndoCommands::Group(a) => svc.undo_operation_group(&a.id, &a.actor, &a.reason).await,
    };

    let response = respond(result);
    output(&response, flags.format)?;
    Ok(response.success)
}
