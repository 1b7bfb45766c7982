use std::sync::Arc;

use env_logger::Env;
use log::{info, warn};
use tokio::io::BufReader;

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod index;
pub mod models;
pub mod paths;
pub mod repository;
pub mod service;
pub mod trash;

use crate::commands::AppState;
use crate::config::{default_config_path, ConfigManager};
use crate::error::{Result, StoreError};
use crate::host::HeadlessHost;
use crate::paths::NotePaths;

/// Starts the note store and serves JSON-line requests on stdin/stdout
/// until stdin closes.
pub async fn run() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let paths = NotePaths::new()?;
    paths.ensure_root()?;
    info!("Notes root: {}", paths.root_dir().display());

    let config_path = default_config_path()
        .unwrap_or_else(|| paths.root_dir().join(".jotpad.json"));
    let config = ConfigManager::new(config_path).unwrap_or_else(|err| {
        warn!("Failed to load config, using defaults: {}", err);
        ConfigManager::with_defaults(paths.root_dir().join(".jotpad.json"))
    });

    let state = AppState::new(paths, Arc::new(HeadlessHost));
    service::spawn_startup_purge(state.clone(), config.trash_retention_days());

    let (handle, service_task) = service::spawn_service(state);
    service::serve_json_lines(handle, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .map_err(|e| StoreError::io("<stdio>", e))?;

    service_task
        .await
        .map_err(|e| StoreError::Task(e.to_string()))
}
