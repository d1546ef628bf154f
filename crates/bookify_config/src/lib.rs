// --- File: crates/bookify_config/src/lib.rs ---
use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod models;
pub use config::ConfigError;
pub use models::*;

/// Prefix of environment overrides, e.g. `BOOKIFY__API__BASE_URL`.
pub const ENV_PREFIX: &str = "BOOKIFY";

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the application configuration.
///
/// Sources, later ones overriding earlier ones:
/// 1. `<config dir>/default.*`
/// 2. `<config dir>/<RUN_ENV>.*` (`RUN_ENV` defaults to `debug`)
/// 3. `BOOKIFY__<SECTION>__<FIELD>` environment variables
///
/// The config directory is `BOOKIFY_CONFIG_DIR` or `./config`. Every field has
/// a default, so missing files are not an error.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = env::var("BOOKIFY_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    load_config_from(&config_dir, &run_env)
}

/// Loads configuration from an explicit directory and run environment.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, ConfigError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);

    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::Message("api.base_url must not be empty".to_string()));
    }
    if config.session.storage_key.trim().is_empty() {
        return Err(ConfigError::Message(
            "session.storage_key must not be empty".to_string(),
        ));
    }
    if config.booking.default_duration_minutes == 0 {
        return Err(ConfigError::Message(
            "booking.default_duration_minutes must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Ensures the dotenv file is loaded into the process environment exactly once.
///
/// The path comes from `DOTENV_OVERRIDE` and falls back to `.env`.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_files() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(dir.path(), "debug").unwrap();

        assert_eq!(config.session.storage_key, "authToken");
        assert_eq!(config.booking.default_duration_minutes, 30);
        assert!(!config.session.dev_bypass);
    }

    #[test]
    fn run_env_file_overrides_default_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[api]\nbase_url = \"https://default.example/api\"\ntimeout_secs = 10\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("staging.toml"),
            "[api]\nbase_url = \"https://staging.example/api\"\n[session]\ndev_bypass = true\n",
        )
        .unwrap();

        let config = load_config_from(dir.path(), "staging").unwrap();

        assert_eq!(config.api.base_url, "https://staging.example/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.session.dev_bypass);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default.toml"), "[api]\nbase_url = \"\"\n").unwrap();

        assert!(load_config_from(dir.path(), "debug").is_err());
    }
}
