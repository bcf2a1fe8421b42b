use anyhow::Context;
use kin_config::KinConfig;
use kin_db::KinService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: KinService,
}

impl AppContext {
    /// Load configuration and open the database it points at.
    pub async fn init(flags: &GlobalFlags) -> anyhow::Result<Self> {
        let mut config = KinConfig::load_with_dotenv().context("failed to load kin config")?;
        if let Some(path) = &flags.db {
            config.database.path.clone_from(path);
        }
        config.database.validate()?;

        if let Some(dir) = config.database.parent_dir() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        tracing::debug!(path = %config.database.path, "opening database");
        let service = KinService::new_local(&config.database.path, &config.undo)
            .await
            .context("failed to initialize kin-db service")?;

        Ok(Self { service })
    }
}
