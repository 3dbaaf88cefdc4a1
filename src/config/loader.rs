//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate, lowest precedence first:
//!
//! 1. `<dir>/base.yaml` (optional; built-in defaults fill any gaps)
//! 2. `<dir>/<environment>.yaml` (optional)
//! 3. `VENTURE__SECTION__FIELD` environment variables

use super::error::{ConfigResult, ConfigurationError};
use super::PipelineConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENV_PREFIX: &str = "VENTURE";
const ENV_SEPARATOR: &str = "__";
const BASE_FILE: &str = "base.yaml";

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: PipelineConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_layered(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = environment,
            poll_interval_seconds = config.scheduler.poll_interval_seconds,
            dispatch_batch_size = config.scheduler.dispatch_batch_size,
            max_concurrent = config.orchestrator.max_concurrent,
            handler_timeout_ms = config.router.handler_timeout_ms,
            failure_threshold = config.circuit_breaker.failure_threshold,
            "🔧 Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: PipelineConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_layered(config_directory: &Path, environment: &str) -> ConfigResult<PipelineConfig> {
        let base_path = config_directory.join(BASE_FILE);
        let env_path = config_directory.join(format!("{environment}.yaml"));

        let mut builder = Config::builder();

        if base_path.is_file() {
            builder = builder.add_source(File::new(&path_str(&base_path)?, FileFormat::Yaml));
        } else {
            debug!(
                path = %base_path.display(),
                "No base configuration file, using built-in defaults"
            );
        }

        builder = builder
            .add_source(File::new(&path_str(&env_path)?, FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        let layered = builder
            .build()
            .map_err(|e| ConfigurationError::parse_error(config_directory.display().to_string(), e))?;

        layered
            .try_deserialize::<PipelineConfig>()
            .map_err(|e| ConfigurationError::parse_error(config_directory.display().to_string(), e))
    }

    /// Detect the deployment environment from environment variables
    pub fn detect_environment() -> String {
        env::var("VENTURE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("VENTURE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}

fn path_str(path: &Path) -> ConfigResult<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        ConfigurationError::invalid_value(
            "config_directory",
            path.display().to_string(),
            "path is not valid UTF-8",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().orchestrator.max_concurrent, 5);
    }

    #[test]
    fn test_environment_overlay_overrides_base() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "scheduler:\n  dispatch_batch_size: 8\norchestrator:\n  max_concurrent: 4\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("staging.yaml"),
            "orchestrator:\n  max_concurrent: 2\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging")
                .unwrap();
        assert_eq!(manager.config().orchestrator.max_concurrent, 2);
        assert_eq!(manager.config().scheduler.dispatch_batch_size, 8);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "circuit_breaker:\n  cooldown_seconds: 0\n",
        )
        .unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(
            result,
            Err(ConfigurationError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.yaml"), "scheduler: [unclosed\n").unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(result, Err(ConfigurationError::ParseError { .. })));
    }
}
