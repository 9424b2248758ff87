//! Health command handler.

use clap::Args;
use vaultqa_core::{config::AppConfig, AppError, AppResult};
use vaultqa_knowledge::config::{get_index_path, load_config};
use vaultqa_knowledge::ServingState;

/// Report whether an index is loaded and how many chunks it holds
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let engine = load_config(&config.workspace)?;
        let state = ServingState::from_config(&engine);

        match state.load_from(&get_index_path(&config.workspace), &engine) {
            Ok(_) | Err(AppError::IndexNotReady) => {}
            Err(e) => tracing::warn!("Index could not be loaded: {}", e),
        }

        let health = state.health();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&health)?);
        } else {
            println!("Status: {}", health.status);
            println!("Chunks loaded: {}", health.chunk_count);
        }

        Ok(())
    }
}
