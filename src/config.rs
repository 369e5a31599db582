use crate::error::{Result, SwipeboxError};
use notify::{Event, EventKind, RecursiveMode, Watcher, event::ModifyKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_LOCALE: &str = "en";
const CONFIG_DIR_NAME: &str = "swipebox";
const CONFIG_FILE_NAME: &str = "swipebox.json";

// Resolved once; tests hammering dirs::config_dir from many threads otherwise contend
static CONFIG_DIR: LazyLock<Option<PathBuf>> = LazyLock::new(dirs::config_dir);

fn get_config_dir() -> Result<PathBuf> {
    CONFIG_DIR.clone().ok_or(SwipeboxError::NoConfigDir)
}

/// Swipe release policy.
#[derive(Serialize, Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwipeConfig {
    /// When false, every release finishes the pending navigation.
    pub revert_enabled: bool,
    /// Fraction of the display width a drag must cover to commit when
    /// `revert_enabled` is set.
    pub commit_threshold: f32,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            revert_enabled: false,
            commit_threshold: 0.5,
        }
    }
}

#[derive(Serialize, Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    pub enabled: bool,
    pub effect: String, // "snap", "slide", "spring"
    pub duration_ms: u64,
    pub stiffness: f64,
    pub damping: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            effect: "slide".to_string(),
            duration_ms: 250,
            stiffness: 170.0,
            damping: 26.0,
        }
    }
}

#[derive(Serialize, Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Longest edge of a decoded preview, in pixels.
    pub max_dimension: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 16,
            max_dimension: 512,
        }
    }
}

#[derive(Serialize, Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwipeboxConfig {
    pub enable_keyboard_input: bool,
    pub preload_next_image: bool,
    pub backdrop_closes_modal: bool,
    pub show_close_button: bool,
    pub show_image_count: bool,
    pub image_count_separator: String,
    /// Maximum content width in pixels.
    pub width: u32,
    /// Pixels represented by one terminal cell, used to scale mouse drags.
    pub cell_width_px: u16,
    pub locale: Option<String>,
    pub swipe: SwipeConfig,
    pub transition: TransitionConfig,
    pub cache: CacheConfig,
}

impl Default for SwipeboxConfig {
    fn default() -> Self {
        Self {
            enable_keyboard_input: true,
            preload_next_image: true,
            backdrop_closes_modal: false,
            show_close_button: true,
            show_image_count: true,
            image_count_separator: " of ".to_string(),
            width: 1024,
            cell_width_px: 8,
            locale: Some(DEFAULT_LOCALE.to_string()),
            swipe: SwipeConfig::default(),
            transition: TransitionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl SwipeboxConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Reads `config_path`, writing defaults there first if it does not exist.
    /// An unreadable or invalid file yields defaults and is left untouched.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Self::create_default_config(config_path);
        }

        match Self::try_reload_from_file(config_path) {
            Ok(config) => {
                info!(path = %config_path.display(), "loaded config");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "invalid config, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn create_default_config(config_path: &Path) -> Result<Self> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let default_config = Self::default();
        Self::save_config(config_path, &default_config)?;
        info!(path = %config_path.display(), "created default config file");

        Ok(default_config)
    }

    pub fn save_config(config_path: &Path, config: &SwipeboxConfig) -> Result<()> {
        let json_content = serde_json::to_string_pretty(config)?;
        fs::write(config_path, json_content)?;
        Ok(())
    }

    pub fn get_locale(&self) -> String {
        self.locale
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }

    /// Commit threshold clamped into `0.0..=1.0`.
    pub fn commit_threshold(&self) -> f32 {
        self.swipe.commit_threshold.clamp(0.0, 1.0)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = get_config_dir()?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn try_reload_from_file(config_path: &Path) -> Result<SwipeboxConfig> {
        let contents = fs::read_to_string(config_path)?;
        let config = serde_json::from_str::<SwipeboxConfig>(&contents)?;
        Ok(config)
    }

    /// Watches the config directory and sends every successfully or
    /// unsuccessfully reloaded config down the returned channel.
    pub fn start_config_watcher() -> Result<mpsc::Receiver<std::result::Result<SwipeboxConfig, String>>> {
        let config_path = Self::get_config_path()?;
        Self::watch_path(config_path)
    }

    pub fn watch_path(
        config_path: PathBuf,
    ) -> Result<mpsc::Receiver<std::result::Result<SwipeboxConfig, String>>> {
        let (tx, rx) = mpsc::channel();
        let watched_file = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Create(_)
                    ) && event.paths.iter().any(|p| p.ends_with(CONFIG_FILE_NAME));
                    if !relevant {
                        return;
                    }

                    // Editors often write in several chunks
                    thread::sleep(Duration::from_millis(100));

                    let message = SwipeboxConfig::try_reload_from_file(&watched_file)
                        .map_err(|e| format!("Failed to reload config: {}", e));
                    debug!(ok = message.is_ok(), "config change detected");
                    // Receiver gone means the app is shutting down
                    let _ = tx.send(message);
                }
                Err(e) => {
                    let _ = tx.send(Err(format!("Watch error: {}", e)));
                }
            }
        })?;

        // Watch the directory; editors replace the file instead of writing in place
        let config_dir = config_path.parent().ok_or(SwipeboxError::NoConfigDir)?;
        watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
        info!(dir = %config_dir.display(), "watching config directory");

        // Dropping the watcher stops it; keep it alive for the process lifetime
        thread::spawn(move || {
            let _watcher = watcher;
            loop {
                thread::park();
            }
        });

        Ok(rx)
    }
}

/// Command-line settings layered over the config file. They are re-applied
/// after every hot reload so the file cannot undo them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub enable_keyboard_input: Option<bool>,
    pub preload_next_image: Option<bool>,
    pub revert_enabled: Option<bool>,
    pub effect: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut SwipeboxConfig) {
        if let Some(enabled) = self.enable_keyboard_input {
            config.enable_keyboard_input = enabled;
        }
        if let Some(enabled) = self.preload_next_image {
            config.preload_next_image = enabled;
        }
        if let Some(enabled) = self.revert_enabled {
            config.swipe.revert_enabled = enabled;
        }
        if let Some(effect) = &self.effect {
            config.transition.effect = effect.clone();
        }
    }
}
