use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use log::{debug, warn};

use crate::error::{Result, StoreError};
use crate::models::{Config, LastNote, ThemeMode};

/// Debounce delay for config saves (1 second)
const SAVE_DEBOUNCE_MS: u64 = 1000;

/// Platform config location: `<config_dir>/jotpad/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jotpad").join("config.json"))
}

/// ConfigManager handles loading, saving, and updating client preferences.
///
/// Features:
/// - Thread-safe access via RwLock
/// - Debounced saving to avoid excessive disk writes
/// - Merges saved config with defaults for missing fields
pub struct ConfigManager {
    /// The current configuration, shared with the pending save task
    config: Arc<RwLock<Config>>,
    /// Path to the configuration file
    config_path: Arc<PathBuf>,
    /// Handle to the debounced save task
    save_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigManager {
    /// Creates a new ConfigManager, loading existing configuration from disk
    /// and filling missing fields with defaults.
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let config = Self::load_from_file(&config_path)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: Arc::new(config_path),
            save_handle: Mutex::new(None),
        })
    }

    /// A manager that starts from defaults without reading `config_path`.
    pub fn with_defaults(config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(RwLock::new(Config::default())),
            config_path: Arc::new(config_path),
            save_handle: Mutex::new(None),
        }
    }

    /// Loads configuration from file, merging with defaults.
    ///
    /// A missing file yields the default configuration.
    fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        merge_config_with_defaults(&content)
    }

    /// Gets a clone of the current configuration.
    pub fn get(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Updates the configuration in memory using a closure.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    /// Schedules a debounced save operation.
    ///
    /// If a save is already scheduled, it is cancelled and a new one is
    /// scheduled SAVE_DEBOUNCE_MS milliseconds from now.
    pub async fn schedule_save(&self) {
        let mut handle_guard = self.save_handle.lock().await;

        if let Some(handle) = handle_guard.take() {
            handle.abort();
        }

        let config_ref = Arc::clone(&self.config);
        let path_ref = Arc::clone(&self.config_path);

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(SAVE_DEBOUNCE_MS)).await;

            let config = config_ref
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Err(err) = write_config(&path_ref, &config) {
                warn!("Failed to save config: {}", err);
            }
        });

        *handle_guard = Some(handle);
    }

    /// Updates the configuration and schedules a debounced save.
    pub async fn update_and_save<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        self.update(f);
        self.schedule_save().await;
    }

    /// Saves the configuration to disk immediately.
    pub fn save_sync(&self) -> Result<()> {
        write_config(&self.config_path, &self.get())
    }

    pub fn pinned_notes(&self) -> Vec<String> {
        self.get().pinned_notes
    }

    pub fn set_pinned_notes(&self, pinned_notes: Vec<String>) {
        self.update(|config| {
            config.pinned_notes = pinned_notes;
        });
    }

    pub fn theme(&self) -> ThemeMode {
        self.get().theme
    }

    pub fn set_theme(&self, theme: ThemeMode) {
        self.update(|config| {
            config.theme = theme;
        });
    }

    pub fn trash_retention_days(&self) -> u32 {
        self.get().trash_retention_days
    }

    pub fn last_note(&self) -> Option<LastNote> {
        self.get().last_note
    }

    pub fn set_last_note(&self, last_note: Option<LastNote>) {
        self.update(|config| {
            config.last_note = last_note;
        });
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).map_err(|e| StoreError::io(path, e))?;
    debug!("Saved config to {}", path.display());
    Ok(())
}

/// Merges a partial config JSON with defaults.
///
/// Fields that are missing or of the wrong type keep their default value.
pub fn merge_config_with_defaults(partial_json: &str) -> Result<Config> {
    if partial_json.trim().is_empty() {
        return Ok(Config::default());
    }

    let json_value: serde_json::Value = serde_json::from_str(partial_json)?;

    let mut config = Config::default();

    if let Some(obj) = json_value.as_object() {
        if let Some(v) = obj.get("pinned_notes").and_then(|v| v.as_array()) {
            config.pinned_notes = v
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect();
        }
        if let Some(v) = obj.get("theme") {
            if let Ok(theme) = serde_json::from_value(v.clone()) {
                config.theme = theme;
            }
        }
        if let Some(v) = obj
            .get("trash_retention_days")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
        {
            config.trash_retention_days = v;
        }
        if let Some(v) = obj.get("last_note") {
            if let Ok(last_note) = serde_json::from_value(v.clone()) {
                config.last_note = last_note;
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteExt;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_manager_new_no_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::new(config_path).unwrap();
        assert_eq!(manager.get(), Config::default());
    }

    #[test]
    fn test_config_manager_load_existing() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let partial_config = r#"{
            "pinned_notes": ["Ideas", 42, "Todo"],
            "theme": "dark"
        }"#;
        fs::write(&config_path, partial_config).unwrap();

        let manager = ConfigManager::new(config_path).unwrap();
        let config = manager.get();

        assert_eq!(config.pinned_notes, vec!["Ideas", "Todo"]);
        assert_eq!(config.theme, ThemeMode::Dark);
        assert_eq!(config.trash_retention_days, 30);
        assert!(config.last_note.is_none());
    }

    #[test]
    fn test_config_manager_corrupt_file_is_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ nope").unwrap();

        assert!(matches!(
            ConfigManager::new(config_path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_config_manager_update_and_save_sync() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::new(config_path.clone()).unwrap();
        manager.set_pinned_notes(vec!["Pinned".to_string()]);
        manager.set_theme(ThemeMode::Light);
        manager.set_last_note(Some(LastNote {
            title: "Pinned".to_string(),
            ext: NoteExt::Markdown,
        }));
        manager.save_sync().unwrap();

        let reloaded = ConfigManager::new(config_path).unwrap();
        assert_eq!(reloaded.pinned_notes(), vec!["Pinned"]);
        assert_eq!(reloaded.theme(), ThemeMode::Light);
        assert_eq!(reloaded.last_note().unwrap().ext, NoteExt::Markdown);
    }

    #[tokio::test]
    async fn test_schedule_save_is_debounced() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::new(config_path.clone()).unwrap();

        manager
            .update_and_save(|c| c.pinned_notes = vec!["first".to_string()])
            .await;
        manager
            .update_and_save(|c| c.pinned_notes = vec!["second".to_string()])
            .await;
        assert!(!config_path.exists());

        sleep(Duration::from_millis(SAVE_DEBOUNCE_MS + 500)).await;

        let saved = merge_config_with_defaults(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(saved.pinned_notes, vec!["second"]);
    }

    #[test]
    fn test_merge_config_with_defaults_empty() {
        assert_eq!(merge_config_with_defaults("").unwrap(), Config::default());
    }

    #[test]
    fn test_merge_config_ignores_bad_types() {
        let config = merge_config_with_defaults(
            r#"{"theme": "neon", "trash_retention_days": -4, "last_note": {"title": "x", "ext": ".doc"}}"#,
        )
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_merge_config_with_defaults_full() {
        let full = serde_json::to_string(&Config::default()).unwrap();
        assert_eq!(merge_config_with_defaults(&full).unwrap(), Config::default());
    }

    fn optional_theme() -> impl Strategy<Value = Option<ThemeMode>> {
        prop_oneof![
            Just(None),
            Just(Some(ThemeMode::Light)),
            Just(Some(ThemeMode::Dark)),
            Just(Some(ThemeMode::System)),
        ]
    }

    fn optional_pinned_notes() -> impl Strategy<Value = Option<Vec<String>>> {
        prop_oneof![
            Just(None),
            proptest::collection::vec("[a-zA-Z0-9 _-]{1,20}", 0..5).prop_map(Some),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any partial configuration, provided fields are used and
        /// missing fields keep their defaults.
        #[test]
        fn prop_config_merge_preserves_defaults(
            pinned_notes in optional_pinned_notes(),
            theme in optional_theme(),
            retention in proptest::option::of(0u32..365),
        ) {
            let mut json_obj = serde_json::Map::new();
            if let Some(v) = &pinned_notes {
                json_obj.insert("pinned_notes".to_string(), serde_json::json!(v));
            }
            if let Some(v) = theme {
                json_obj.insert("theme".to_string(), serde_json::to_value(v).unwrap());
            }
            if let Some(v) = retention {
                json_obj.insert("trash_retention_days".to_string(), serde_json::json!(v));
            }

            let partial_json = serde_json::to_string(&json_obj).unwrap();
            let config = merge_config_with_defaults(&partial_json).unwrap();
            let defaults = Config::default();

            prop_assert_eq!(config.pinned_notes, pinned_notes.unwrap_or(defaults.pinned_notes));
            prop_assert_eq!(config.theme, theme.unwrap_or(defaults.theme));
            prop_assert_eq!(
                config.trash_retention_days,
                retention.unwrap_or(defaults.trash_retention_days)
            );
            prop_assert_eq!(config.last_note, defaults.last_note);
        }
    }
}
