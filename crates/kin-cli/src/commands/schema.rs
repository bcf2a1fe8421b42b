use anyhow::Context;
use kin_schema::SchemaRegistry;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

/// Handle `kin schema`. Needs no database.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let registry = SchemaRegistry::new();
    match args.name.as_deref() {
        Some(name) => {
            let schema = registry
                .get(name)
                .with_context(|| format!("unknown schema '{name}'; run 'kin schema' to list"))?;
            output(schema, flags.format)
        }
        None => output(&registry.list(), flags.format),
    }
}
