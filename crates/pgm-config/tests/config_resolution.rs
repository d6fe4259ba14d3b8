//! Engine configuration resolution and validation against real files.
//!
//! Covers:
//! - Resolution order (CLI > PGM_CONFIG > PGM_CONFIG_DIR > XDG)
//! - TOML and JSON loading through `load_config`
//! - Validation failures surfacing through the loader

use pgm_config::resolve::{load_config, resolve_config, ConfigSource};
use pgm_config::validate::ValidationError;
use pgm_config::HeuristicKind;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const KEYS: &[&str] = &["PGM_CONFIG", "PGM_CONFIG_DIR", "XDG_CONFIG_HOME"];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|k| (k.to_string(), env::var(k).ok()))
            .collect();
        for key in keys {
            env::remove_var(key);
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(dir: &Path, heuristic: &str) {
    fs::create_dir_all(dir).expect("create config dir");
    fs::write(
        dir.join("engine.toml"),
        format!("heuristic = \"{}\"\n", heuristic),
    )
    .expect("write engine.toml");
}

#[test]
fn test_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let cli_dir = temp.path().join("cli");
        let env_dir = temp.path().join("env");
        write_config(&cli_dir, "max_cardinality");
        write_config(&env_dir, "min_neighbors");

        env::set_var("PGM_CONFIG", env_dir.join("engine.toml"));

        let cli = cli_dir.join("engine.toml");
        let resolved = resolve_config(Some(&cli));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.as_deref(), Some(cli.as_path()));

        let (config, _) = load_config(Some(&cli)).expect("load");
        assert_eq!(config.heuristic, HeuristicKind::MaxCardinality);
    });
}

#[test]
fn test_env_path_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let env_dir = temp.path().join("env");
        let config_dir = temp.path().join("config_dir");
        write_config(&env_dir, "max_cardinality");
        write_config(&config_dir, "min_neighbors");

        env::set_var("PGM_CONFIG", env_dir.join("engine.toml"));
        env::set_var("PGM_CONFIG_DIR", &config_dir);

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path, Some(env_dir.join("engine.toml")));
    });
}

#[test]
fn test_config_dir_over_xdg() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let config_dir = temp.path().join("config_dir");
        let xdg = temp.path().join("xdg");
        write_config(&config_dir, "min_neighbors");
        write_config(&xdg.join("pgm"), "max_cardinality");

        env::set_var("PGM_CONFIG_DIR", &config_dir);
        env::set_var("XDG_CONFIG_HOME", &xdg);

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path, Some(config_dir.join("engine.toml")));
    });
}

#[test]
fn test_xdg_when_nothing_else_set() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let xdg = temp.path().join("xdg");
        write_config(&xdg.join("pgm"), "max_cardinality");
        env::set_var("XDG_CONFIG_HOME", &xdg);

        let (config, resolved) = load_config(None).expect("load");
        assert_eq!(resolved.source, ConfigSource::XdgConfig);
        assert_eq!(config.heuristic, HeuristicKind::MaxCardinality);
    });
}

#[test]
fn test_json_config_file() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("engine.json");
        fs::write(&path, r#"{"rescale": false, "max_scope_products": 64}"#).unwrap();

        let (config, resolved) = load_config(Some(&path)).expect("load");
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert!(!config.rescale);
        assert_eq!(config.max_scope_products, 64);
    });
}

#[test]
fn test_invalid_file_rejected_by_loader() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(KEYS);
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("engine.toml");
        fs::write(&path, "precision = 40\n").unwrap();

        let err = load_config(Some(&path)).expect_err("precision too large");
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        fs::write(&path, "rescale = \"sometimes\"\n").unwrap();
        let err = load_config(Some(&path)).expect_err("type error");
        assert!(matches!(err, ValidationError::ParseError(_)));
    });
}
