use clap::{Args, Subcommand};

use crate::cli::subcommands::UndoCommands;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Check whether an actor may undo an entry.
    Check(CheckArgs),
    /// Reverse recorded mutations.
    Undo {
        #[command(subcommand)]
        action: UndoCommands,
    },
    /// Query the audit ledger.
    Audit(AuditArgs),
    /// Dump a registered JSON schema, or list them.
    Schema(SchemaArgs),
}

/// Arguments for `kin check`.
#[derive(Clone, Debug, Args)]
pub struct CheckArgs {
    pub entry_id: String,
    #[arg(long)]
    pub actor: String,
}

/// Arguments for `kin audit`.
#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub entity_kind: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    /// Only entries recorded by this actor
    #[arg(long)]
    pub by: Option<String>,
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub batch: Option<String>,
    #[arg(long)]
    pub group: Option<String>,
    /// `true` for undone entries only, `false` for active only
    #[arg(long)]
    pub undone: Option<bool>,
}

/// Arguments for `kin schema`.
#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    pub name: Option<String>,
}
