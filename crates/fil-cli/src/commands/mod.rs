pub mod moves;
pub mod plan;
pub mod usage;

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;

use fil_core::{AliasTable, FilConfig};
use fil_inventory::SpoolmanClient;

/// Loaded configuration shared by every command.
pub struct Context {
    pub config: FilConfig,
    pub aliases: AliasTable,
}

impl Context {
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config = FilConfig::load(explicit).context("loading configuration")?;
        let aliases = config.aliases();
        Ok(Self { config, aliases })
    }

    pub fn connect(&self) -> anyhow::Result<SpoolmanClient> {
        let base = self.config.api_base()?;
        let timeout = Duration::from_secs(self.config.request_timeout_secs());
        SpoolmanClient::new(base, timeout)
            .with_context(|| format!("connecting to Spoolman at {base}"))
    }
}
