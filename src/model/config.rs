use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CONFIG_PATH: &str = "PB_CONFIG_PATH";
const ENV_MODEL_PATH: &str = "PB_MODEL_PATH";
const ENV_BACKGROUND_PATH: &str = "PB_BACKGROUND_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_MODEL_PATH: &str = "random_forest_model.json";
const DEFAULT_BACKGROUND_PATH: &str = "shap_background_data.json";
const DEFAULT_MAX_BACKGROUND_SAMPLES: usize = 100;

/// Locations of the serialized classifier and background dataset
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_background_path")]
    pub background_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            background_path: default_background_path(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_background_path() -> PathBuf {
    PathBuf::from(DEFAULT_BACKGROUND_PATH)
}

/// Explainer tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainerConfig {
    /// Background rows kept as the reference distribution
    #[serde(default = "default_max_background_samples")]
    pub max_background_samples: usize,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            max_background_samples: DEFAULT_MAX_BACKGROUND_SAMPLES,
        }
    }
}

fn default_max_background_samples() -> usize {
    DEFAULT_MAX_BACKGROUND_SAMPLES
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub explainer: ExplainerConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub artifacts: ArtifactConfig,
    pub explainer: ExplainerConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts: ArtifactConfig::default(),
            explainer: ExplainerConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        let mut artifacts = file.artifacts;
        if let Ok(path) = std::env::var(ENV_MODEL_PATH) {
            artifacts.model_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(ENV_BACKGROUND_PATH) {
            artifacts.background_path = PathBuf::from(path);
        }

        Self {
            artifacts,
            explainer: file.explainer,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => parse_config_file(path, &contents),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_config_file(path: &Path, contents: &str) -> Option<ConfigFile> {
    let contents = contents.trim();
    if contents.is_empty() {
        tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
        return Some(ConfigFile::default());
    }

    match serde_yaml::from_str(contents) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Loaded configuration from file");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
            None
        }
    }
}
