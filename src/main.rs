//! noted - personal Markdown notes server.
//!
//! Usage: `noted [CONFIG_FILE]`
//!
//! Serves the browser UI on http://127.0.0.1:<server_port>/ until `/terminate`
//! is requested or Ctrl-C is pressed, then runs a final database sync.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use noted::config::Config;
use noted::database::Database;
use noted::error::{NotedError, NotedResult};
use noted::note_store::NoteStore;
use noted::server::{start_server, AppState};
use noted::sync::update_database;

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

/// Locate and load the configuration, writing a template when none exists.
fn load_config() -> NotedResult<Config> {
    let path = Config::locate(std::env::args_os().nth(1).map(PathBuf::from))?;
    if !path.exists() {
        Config::write_template(&path)?;
        return Err(NotedError::config(format!(
            "no configuration found; a template was written to {}, edit it and restart",
            path.display()
        )));
    }
    Config::load(&path)
}

async fn run(config: Config) -> NotedResult<()> {
    tracing::info!(
        "noted {} using notes in {}",
        config.version(),
        config.notes_path().display()
    );
    if let Some(backup) = config.backup_path() {
        tracing::debug!("Backup path {} configured", backup.display());
    }

    let store = NoteStore::new(config.notes_path())?;
    let db = Database::new(config.database_path())?;
    let port = config.server_port();

    let (state, shutdown) = AppState::new(store, db, config);
    start_server(state.clone(), shutdown, port).await?;

    tracing::info!("Server stopped, running final database sync");
    let db = state.db()?;
    update_database(state.store(), &db, state.config().exclude_prefixes())?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_config();
    init_tracing(config.as_ref().map(|c| c.debug()).unwrap_or(false));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
