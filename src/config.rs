use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default)]
    pub gemini_api_key_primary: String,

    #[serde(default)]
    pub gemini_api_key_backup: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_image_model")]
    pub gemini_image_model: String,

    #[serde(default)]
    pub weather_api_key: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialAppConfig {
    database_path: Option<String>,
    gemini_api_key_primary: Option<String>,
    gemini_api_key_backup: Option<String>,
    gemini_model: Option<String>,
    gemini_image_model: Option<String>,
    weather_api_key: Option<String>,
    request_timeout_secs: Option<u64>,
}

fn default_database_path() -> String {
    "cirrus.duckdb".to_string()
}

fn default_gemini_model() -> String {
    crate::llm::gemini::DEFAULT_MODEL.to_string()
}

fn default_gemini_image_model() -> String {
    crate::llm::image::DEFAULT_IMAGE_MODEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    crate::llm::gemini::DEFAULT_TIMEOUT_SECS
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Loads configuration from an optional TOML file merged with
    /// environment variables; the environment wins.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config: PartialAppConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialAppConfig::default()
            }
        } else {
            PartialAppConfig::default()
        };

        let env_timeout = match env_opt("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| format!("REQUEST_TIMEOUT_SECS must be an integer: {e}"))?,
            ),
            None => None,
        };

        Ok(AppConfig {
            database_path: env_opt("DATABASE_PATH")
                .or(file_config.database_path)
                .unwrap_or_else(default_database_path),
            gemini_api_key_primary: env_opt("GEMINI_API_KEY_PRIMARY")
                .or(file_config.gemini_api_key_primary)
                .unwrap_or_default(),
            gemini_api_key_backup: env_opt("GEMINI_API_KEY_BACKUP")
                .or(file_config.gemini_api_key_backup)
                .unwrap_or_default(),
            gemini_model: env_opt("GEMINI_MODEL")
                .or(file_config.gemini_model)
                .unwrap_or_else(default_gemini_model),
            gemini_image_model: env_opt("GEMINI_IMAGE_MODEL")
                .or(file_config.gemini_image_model)
                .unwrap_or_else(default_gemini_image_model),
            weather_api_key: env_opt("WEATHER_API_KEY")
                .or(file_config.weather_api_key)
                .unwrap_or_default(),
            request_timeout_secs: env_timeout
                .or(file_config.request_timeout_secs)
                .unwrap_or_else(default_request_timeout_secs),
        })
    }
}
