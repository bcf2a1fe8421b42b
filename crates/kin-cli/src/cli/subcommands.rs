use clap::{Args, Subcommand};

/// Target and attribution shared by every undo command.
#[derive(Clone, Debug, Args)]
pub struct UndoArgs {
    /// Audit entry id (operation group id for `undo group`)
    pub id: String,
    /// Acting user id
    #[arg(long)]
    pub actor: String,
    /// Free-text reason recorded on the reverted entry
    #[arg(long, default_value = "")]
    pub reason: String,
}

/// Undo commands.
#[derive(Clone, Debug, Subcommand)]
pub enum UndoCommands {
    /// Restore fields changed by an update entry.
    Update(UndoArgs),
    /// Restore a single deleted profile or relationship.
    Delete(UndoArgs),
    /// Restore every entity deleted in the entry's batch.
    Cascade(UndoArgs),
    /// Retract a relationship creation.
    Relationship(UndoArgs),
    /// Undo any entry, picking the handler from its action kind.
    Entry(UndoArgs),
    /// Undo every entry of an operation group.
    Group(UndoArgs),
}
