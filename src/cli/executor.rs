//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{
    CheckCommandHandler, EntryCommandHandler, FlushCommandHandler, MaintainCommandHandler,
    RunCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::cache::Cache;
use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings
///
/// `check` never opens the cache; every other command connects to the
/// configured backend first.
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli)?;

    if !cli.needs_cache() {
        return CheckCommandHandler::new(settings).execute().await;
    }

    let cache = Cache::connect(&settings.cache).await?;
    dispatch(&cli.command, cache, &settings).await
}

/// Run a cache-backed command against an open cache
pub async fn dispatch(command: &Commands, cache: Cache, settings: &Settings) -> AppResult<()> {
    match command {
        Commands::Get { key } => {
            let value = EntryCommandHandler::new(cache).get(key).await?;
            let rendered = serde_json::to_string_pretty(&value)
                .map_err(|e| AppError::from(anyhow::Error::from(e)))?;
            println!("{}", rendered);
        }
        Commands::Set { key, value, ttl } => {
            EntryCommandHandler::new(cache).set(key, value, *ttl).await?;
        }
        Commands::Has { key } => {
            let present = EntryCommandHandler::new(cache).has(key).await?;
            println!("{}", present);
        }
        Commands::Forget { key } => {
            EntryCommandHandler::new(cache).forget(key).await?;
        }
        Commands::Flush { prefix } => {
            FlushCommandHandler::new(cache).execute(prefix.as_deref()).await?;
        }
        Commands::Maintain => {
            MaintainCommandHandler::new(cache, &settings.cache.maintenance)
                .execute()
                .await?;
        }
        Commands::Run => {
            RunCommandHandler::new(cache, settings.cache.maintenance.clone())
                .execute()
                .await?;
        }
        Commands::Check => {
            CheckCommandHandler::new(settings.clone()).execute().await?;
        }
    }

    Ok(())
}

/// Validate command arguments before execution
fn validate_command_args(cli: &Cli) -> AppResult<()> {
    cli.validate()
        .map_err(|reason| AppError::validation("cli_arguments", reason))
}
