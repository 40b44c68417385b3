//! Configuration management for Roundtable
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/roundtable/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{Result, RoundtableError};

/// Main configuration for Roundtable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat model endpoint used by assistant participants
    #[serde(default)]
    pub model: ModelConfig,
    /// Run loop defaults
    #[serde(default)]
    pub team: TeamConfig,
    /// Credentials and endpoints for the built-in tools
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Whether to emit debug logs
    #[serde(default)]
    pub debug: bool,
}

/// OpenAI-compatible chat endpoint configuration
///
/// Fields missing from the file keep their environment-derived defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the API (the client appends /chat/completions)
    pub base_url: String,
    /// Bearer token for the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Default model name for assistant participants
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Run loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Upper bound on turns per run
    /// Default: 10
    pub max_turns: usize,
    /// Substring that ends a run when it appears in a turn's message
    /// Default: TERMINATE
    pub termination_marker: String,
    /// Per-turn timeout in seconds (none = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,
    /// Per-call tool timeout in seconds
    pub tool_timeout_secs: u64,
    /// Maximum model/tool round trips inside one assistant turn
    pub max_tool_rounds: usize,
}

/// Built-in tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Weather API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,
    /// Weather API base URL
    pub weather_url: String,
    /// Langflow run endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub langflow_url: Option<String>,
    /// Langflow bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub langflow_auth_token: Option<String>,
    /// Langflow x-api-key header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub langflow_api_key: Option<String>,
    /// Stable Diffusion service base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Root directory for the write_file tool
    pub workspace_root: PathBuf,
    /// Request timeout in seconds for the built-in remote tools
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("ROUNDTABLE_MODEL_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            api_key: env::var("ROUNDTABLE_API_KEY")
                .or_else(|_| env::var("OPENROUTER_API_KEY"))
                .ok(),
            model: env::var("MODEL").unwrap_or_else(|_| "google/gemini-2.0-flash-001".to_string()),
            timeout_secs: 120,
        }
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            max_turns: env::var("ROUNDTABLE_MAX_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            termination_marker: "TERMINATE".to_string(),
            turn_timeout_secs: None,
            tool_timeout_secs: 60,
            max_tool_rounds: 3,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            weather_api_key: env::var("WEATHER_API_KEY").ok(),
            weather_url: "https://api.weatherapi.com/v1".to_string(),
            langflow_url: env::var("LANGFLOW_API_URL").ok(),
            langflow_auth_token: env::var("LANGFLOW_AUTH_TOKEN").ok(),
            langflow_api_key: env::var("LANGFLOW_API_KEY").ok(),
            image_url: env::var("STABLE_DIFFUSION_URL").ok(),
            workspace_root: PathBuf::from("."),
            timeout_secs: 60,
        }
    }
}

impl TeamConfig {
    /// Per-turn timeout as a duration
    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_secs.map(Duration::from_secs)
    }

    /// Per-call tool timeout as a duration
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roundtable")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                if Self::config_exists() {
                    tracing::warn!(
                        path = %Self::config_file().display(),
                        error = %e,
                        "ignoring unreadable config file, using defaults"
                    );
                } else {
                    tracing::debug!("no config file, using defaults");
                }
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(RoundtableError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| RoundtableError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RoundtableError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file and return the path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| RoundtableError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RoundtableError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| RoundtableError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Render the configuration as TOML for display
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_team_config() {
        let config = Config::default();
        assert_eq!(config.team.termination_marker, "TERMINATE");
        assert_eq!(config.team.tool_timeout(), Duration::from_secs(60));
        assert!(config.team.turn_timeout().is_none());
        assert!(config.team.max_tool_rounds > 0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            debug = true

            [team]
            max_turns = 4
            termination_marker = "DONE"
            tool_timeout_secs = 5
            max_tool_rounds = 2
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.team.max_turns, 4);
        assert_eq!(config.team.termination_marker, "DONE");
        assert_eq!(config.model.timeout_secs, 120);
    }

    #[test]
    fn test_single_field_sections() {
        let config = Config::from_toml("[team]\nmax_turns = 4\n").unwrap();
        assert_eq!(config.team.max_turns, 4);
        assert_eq!(config.team.termination_marker, "TERMINATE");
        assert_eq!(config.team.tool_timeout_secs, 60);

        let config = Config::from_toml("[tools]\nweather_api_key = \"k\"\n").unwrap();
        assert_eq!(config.tools.weather_api_key.as_deref(), Some("k"));
        assert_eq!(config.tools.weather_url, "https://api.weatherapi.com/v1");
        assert_eq!(config.tools.timeout_secs, 60);
    }

    #[test]
    fn test_model_section_keeps_env_key() {
        std::env::set_var("ROUNDTABLE_API_KEY", "from-env");
        let config = Config::from_toml("[model]\nmodel = \"local/llama\"\n").unwrap();
        std::env::remove_var("ROUNDTABLE_API_KEY");

        assert_eq!(config.model.model, "local/llama");
        assert_eq!(config.model.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.model.timeout_secs, 120);
    }

    #[test]
    fn test_secrets_not_serialized_when_absent() {
        let mut config = Config::default();
        config.model.api_key = None;
        config.tools.weather_api_key = None;
        config.tools.langflow_api_key = None;
        let toml_str = config.to_toml();
        assert!(!toml_str.contains("api_key"));
        assert!(toml_str.contains("termination_marker"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("roundtable"));
    }
}
