use clap::Parser;

use tandem_cache::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};
use tandem_cache::error::AppError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => exit_with(AppError::from(e)),
    };

    let _log_handle = init_logger_from_settings(&settings)?;
    tracing::debug!(
        version = tandem_cache::pkg_version(),
        app = %settings.application.name,
        backend = ?settings.cache.backend,
        "Configuration loaded"
    );

    if let Err(e) = execute_command(&cli, settings).await {
        tracing::error!(error = ?e, "Command failed");
        exit_with(e);
    }

    Ok(())
}

fn exit_with(error: AppError) -> ! {
    let code = error.exit_code();
    eprintln!("Error: {:#}", anyhow::Error::from(error));
    std::process::exit(code);
}
