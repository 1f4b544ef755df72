// Configuration loading and parsing (reelwheel.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::item::{OwnerId, MAX_WHEEL_ITEMS};
use crate::spin::SpinSettings;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub wheel: WheelConfig,
    pub spin: SpinConfig,
    pub db_path: String,
    pub tmdb: TmdbConfig,
    pub default_owner: Option<OwnerId>,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// reelwheel.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    wheel: WheelConfig,
    spin: SpinConfig,
    #[serde(default)]
    database: DatabaseSection,
    tmdb: TmdbConfig,
    #[serde(default)]
    owner: OwnerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_max_items() -> usize {
    MAX_WHEEL_ITEMS
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpinConfig {
    pub duration_ms: u64,
    pub frame_interval_ms: u64,
    pub min_spins: u32,
    pub extra_spins_min: u32,
    pub extra_spins_max: u32,
}

impl SpinConfig {
    pub fn settings(&self) -> SpinSettings {
        SpinSettings {
            duration: Duration::from_millis(self.duration_ms),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            min_spins: self.min_spins,
            extra_spins_min: self.extra_spins_min,
            extra_spins_max: self.extra_spins_max,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DatabaseSection {
    /// Omitted means the platform data directory.
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct OwnerSection {
    default: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub tmdb_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/reelwheel.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not seed missing files; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- reelwheel.toml (required) ---
    let app_path = config_dir.join("reelwheel.toml");
    let app_text = read_file(&app_path)?;
    let app: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let db_path = app.database.path.unwrap_or_else(default_db_path);
    let default_owner = app
        .owner
        .default
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(OwnerId::new);

    let config = Config {
        wheel: app.wheel,
        spin: app.spin,
        db_path,
        tmdb: app.tmdb,
        default_owner,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, seeding missing
/// files from `defaults/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// `reelwheel.db` in the platform data directory, or the working directory
/// when no home directory can be determined.
pub fn default_db_path() -> String {
    directories::ProjectDirs::from("", "", "reelwheel")
        .map(|dirs| dirs.data_dir().join("reelwheel.db"))
        .unwrap_or_else(|| PathBuf::from("reelwheel.db"))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.wheel.max_items == 0 {
        return Err(invalid("wheel.max_items", "must be greater than 0"));
    }

    let spin = &config.spin;
    if spin.duration_ms == 0 {
        return Err(invalid("spin.duration_ms", "must be greater than 0"));
    }
    if spin.frame_interval_ms == 0 {
        return Err(invalid("spin.frame_interval_ms", "must be greater than 0"));
    }
    if spin.min_spins == 0 {
        return Err(invalid("spin.min_spins", "must be at least 1"));
    }
    if spin.extra_spins_min == 0 {
        return Err(invalid("spin.extra_spins_min", "must be at least 1"));
    }
    if spin.extra_spins_min > spin.extra_spins_max {
        return Err(invalid(
            "spin.extra_spins_max",
            format!(
                "must be >= extra_spins_min ({}), got {}",
                spin.extra_spins_min, spin.extra_spins_max
            ),
        ));
    }

    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    if config.tmdb.base_url.trim().is_empty() {
        return Err(invalid("tmdb.base_url", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
