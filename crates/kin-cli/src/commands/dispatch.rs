use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
///
/// Returns `Ok(false)` when the command completed but its outcome was a
/// failure the caller should surface through the exit code.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    match command {
        Commands::Check(args) => commands::check::handle(&args, ctx, flags).await,
        Commands::Undo { action } => commands::undo::handle(&action, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
        Commands::Schema(_) => unreachable!("schema is pre-dispatched in main"),
    }
}
