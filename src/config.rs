use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::debounce::DEFAULT_DEBOUNCE;
use crate::error::{ConfigError, ConfigResult as Result};
use crate::transport::TransportConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub element: ElementConfig,
    pub debounce: DebounceConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
}

/// Attributes of the auto-check element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ElementConfig {
    /// Validation endpoint, possibly relative to `base_url`
    pub src: Option<String>,
    /// Authenticity token
    pub csrf: Option<String>,
    /// Base URL relative endpoints resolve against
    pub base_url: Option<String>,
}

/// Debounce configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period in milliseconds
    pub wait_ms: u64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds; unset means no timeout
    pub timeout_seconds: Option<u64>,
    /// User agent string
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Print every notification
    pub verbose: bool,
    /// Only print failed checks
    pub quiet: bool,
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            wait_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            timeout_seconds: transport.timeout_seconds,
            user_agent: transport.user_agent,
        }
    }
}

impl From<&NetworkConfig> for TransportConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            timeout_seconds: network.timeout_seconds,
            user_agent: network.user_agent.clone(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "auto-check.toml",
            "auto-check.json",
            ".auto-check.toml",
            ".auto-check.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("auto-check");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Element attributes
        if let Some(src) = env.get("AUTO_CHECK_SRC") {
            config.element.src = Some(src);
        }
        if let Some(csrf) = env.get("AUTO_CHECK_CSRF") {
            config.element.csrf = Some(csrf);
        }
        if let Some(base_url) = env.get("AUTO_CHECK_BASE_URL") {
            config.element.base_url = Some(base_url);
        }

        if let Some(wait) = env.get("AUTO_CHECK_DEBOUNCE_MS") {
            config.debounce.wait_ms = wait.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid AUTO_CHECK_DEBOUNCE_MS value: {}", wait))
            })?;
        }

        if let Some(timeout) = env.get("AUTO_CHECK_TIMEOUT") {
            config.network.timeout_seconds = Some(timeout.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid AUTO_CHECK_TIMEOUT value: {}", timeout))
            })?);
        }

        if let Some(verbose) = env.get("AUTO_CHECK_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid AUTO_CHECK_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("AUTO_CHECK_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid AUTO_CHECK_QUIET value: {}", quiet))
            })?;
        }

        if let Some(format) = env.get("AUTO_CHECK_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid AUTO_CHECK_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(src) = &cli.src {
            config.element.src = Some(src.clone());
        }
        if let Some(csrf) = &cli.csrf {
            config.element.csrf = Some(csrf.clone());
        }
        if let Some(base_url) = &cli.base_url {
            config.element.base_url = Some(base_url.clone());
        }

        if let Some(wait) = cli.debounce_ms {
            config.debounce.wait_ms = wait;
        }
        if cli.timeout.is_some() {
            config.network.timeout_seconds = cli.timeout;
        }

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.element.src.is_some() {
            base.element.src = override_config.element.src;
        }
        if override_config.element.csrf.is_some() {
            base.element.csrf = override_config.element.csrf;
        }
        if override_config.element.base_url.is_some() {
            base.element.base_url = override_config.element.base_url;
        }

        base.debounce.wait_ms = override_config.debounce.wait_ms;

        if override_config.network.timeout_seconds.is_some() {
            base.network.timeout_seconds = override_config.network.timeout_seconds;
        }
        base.network.user_agent = override_config.network.user_agent;

        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.debounce.wait_ms == 0 {
            return Err(ConfigError::Validation(
                "Debounce wait must be greater than 0".to_string(),
            ));
        }
        if config.debounce.wait_ms > 60_000 {
            return Err(ConfigError::Validation(
                "Debounce wait cannot exceed 60000 ms".to_string(),
            ));
        }

        if config.network.timeout_seconds == Some(0) {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "User agent cannot be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if let Some(base_url) = &config.element.base_url {
            Url::parse(base_url).map_err(|error| ConfigError::InvalidBaseUrl {
                url: base_url.clone(),
                reason: error.to_string(),
            })?;
        }

        Ok(())
    }

    /// Convert configuration to Duration for the debounce window
    pub fn get_debounce_duration(config: &Config) -> Duration {
        Duration::from_millis(config.debounce.wait_ms)
    }
}
