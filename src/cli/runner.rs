//! CLI runner - executes commands

use crate::catalog::Catalog;
use crate::cli::commands::{Cli, Commands};
use crate::client::GaClient;
use crate::config::Config;
use crate::discover::discover;
use crate::error::{Error, Result};
use crate::state::State;
use crate::sync::SyncEngine;
use crate::writer::JsonLinesWriter;
use std::path::Path;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        match &self.cli.command {
            Commands::Discover => Self::discover(&config).await,
            Commands::Sync { catalog, state } => {
                Self::sync(&config, catalog, state.as_deref()).await
            }
        }
    }

    /// Load config from `--config-json`, falling back to `--config`
    fn load_config(&self) -> Result<Config> {
        if let Some(json) = &self.cli.config_json {
            return Config::from_json(json);
        }
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        Config::load(path)
    }

    async fn discover(config: &Config) -> Result<()> {
        let client = GaClient::connect(config).await?;
        let catalog = discover(&client, config).await?;
        let rendered = serde_json::to_string_pretty(&catalog)?;
        println!("{rendered}");
        Ok(())
    }

    async fn sync(config: &Config, catalog_path: &Path, state_path: Option<&Path>) -> Result<()> {
        let catalog = Catalog::from_file(catalog_path)?;
        let state = match state_path {
            Some(path) => State::load(path, &config.view_ids())?,
            None => State::default(),
        };

        let client = GaClient::connect(config).await?;
        let mut writer = JsonLinesWriter::stdout();
        let mut engine = SyncEngine::new(&client, &mut writer, config.page_size());
        engine.sync(config, &catalog, state).await?;
        Ok(())
    }
}
