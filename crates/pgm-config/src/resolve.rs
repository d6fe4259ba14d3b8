//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG paths →
//! system config → built-in defaults.

use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::validate::{validate_engine_config, ValidationError, ValidationResult};

/// Discovered engine configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigPath {
    /// Path to the config file (or None if not found).
    pub path: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/pgm/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "PGM_CONFIG";
pub const ENV_CONFIG_DIR: &str = "PGM_CONFIG_DIR";

/// Config file names looked up inside a directory, in order.
const CONFIG_FILENAMES: &[&str] = &["engine.toml", "engine.json"];

/// Application name for XDG directories.
const APP_NAME: &str = "pgm";

/// Resolve the engine config path.
///
/// Resolution order:
/// 1. Explicit CLI path (if it exists)
/// 2. `PGM_CONFIG` (direct path)
/// 3. `PGM_CONFIG_DIR` + `engine.toml` / `engine.json`
/// 4. XDG config directory (`~/.config/pgm/`)
/// 5. System config (`/etc/pgm/`)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::CliArgument);
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = search_dir(Path::new(&config_dir)) {
            return found(path, ConfigSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = search_dir(&dir) {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    // 5. System config
    if let Some(path) = search_dir(&system_config_dir()) {
        return found(path, ConfigSource::SystemConfig);
    }

    ConfigPath::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPath {
    ConfigPath {
        path: Some(path),
        source,
    }
}

fn search_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Resolve, read and validate the engine configuration.
///
/// An explicit CLI path that does not exist is an error rather than a silent
/// fallback to lower-priority sources.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<(EngineConfig, ConfigPath)> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }

    let resolved = resolve_config(cli_path);
    let config = match &resolved.path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    validate_engine_config(&config)?;
    Ok((config, resolved))
}

/// Get the XDG config directory for pgm.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_search_dir_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("engine.json"), "{}").unwrap();
        assert_eq!(search_dir(dir.path()), Some(dir.path().join("engine.json")));
        std::fs::write(dir.path().join("engine.toml"), "").unwrap();
        assert_eq!(search_dir(dir.path()), Some(dir.path().join("engine.toml")));
    }

    #[test]
    fn test_missing_cli_path_is_error() {
        let err = load_config(Some(Path::new("/nonexistent/pgm/engine.toml"))).unwrap_err();
        assert!(matches!(err, ValidationError::IoError(_)));
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/pgm"));
    }
}
