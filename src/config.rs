use secrecy::{ExposeSecret, SecretBox};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DELIVERY_TICK_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid API key format for {service}: {reason}")]
    InvalidKeyFormat { service: String, reason: String },
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("Environment error: {0}")]
    EnvError(#[from] env::VarError),
}

/// Load `.env.local` and then `.env`; variables already set win.
pub fn load_dotenv() {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
}

/// Configuration for the hosted language model
#[derive(Debug)]
pub struct ApiConfig {
    pub groq_key: SecretBox<String>,
}

impl ApiConfig {
    /// Load API configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();

        let groq_key = Self::load_api_key("GROQ_API_KEY", "Groq")?;

        Ok(Self { groq_key })
    }

    /// Load and validate a single API key from environment
    fn load_api_key(env_var: &str, service_name: &str) -> Result<SecretBox<String>, ConfigError> {
        let key = env::var(env_var).map_err(|_| ConfigError::MissingEnvVar(env_var.to_string()))?;

        if key.trim().is_empty() {
            return Err(ConfigError::InvalidKeyFormat {
                service: service_name.to_string(),
                reason: "API key cannot be empty".to_string(),
            });
        }

        Self::validate_key_format(&key, service_name)?;

        Ok(SecretBox::new(Box::new(key)))
    }

    /// Validate API key format for each service
    fn validate_key_format(key: &str, service: &str) -> Result<(), ConfigError> {
        if service == "Groq" && !key.starts_with("gsk_") {
            return Err(ConfigError::InvalidKeyFormat {
                service: service.to_string(),
                reason: "Groq keys should start with 'gsk_'".to_string(),
            });
        }
        Ok(())
    }

    /// Get Groq API key (use only when making API calls)
    pub fn groq_key(&self) -> &str {
        self.groq_key.expose_secret()
    }
}

/// Where the agents keep their files and how the simulated world behaves.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub data_dir: PathBuf,
    pub delivery_tick: Duration,
    pub model: Option<String>,
    pub base_url: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            delivery_tick: Duration::from_secs(DEFAULT_DELIVERY_TICK_SECS),
            model: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl AgentConfig {
    /// Read `VOICE_AGENT_DATA_DIR`, `DELIVERY_TICK_SECS`, `LLM_MODEL` and `LLM_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = env::var("VOICE_AGENT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = env::var("DELIVERY_TICK_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "DELIVERY_TICK_SECS".to_string(),
                reason: format!("'{}' is not a whole number of seconds", raw),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    name: "DELIVERY_TICK_SECS".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.delivery_tick = Duration::from_secs(secs);
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                config.model = Some(model);
            }
        }

        if let Ok(url) = env::var("LLM_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }

        Ok(config)
    }

    /// Use a different data directory, e.g. from a CLI flag
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_delivery_tick(mut self, tick: Duration) -> Self {
        self.delivery_tick = tick;
        self
    }

    pub fn orders_file(&self) -> PathBuf {
        self.data_dir.join("orders.json")
    }

    pub fn fraud_db_file(&self) -> PathBuf {
        self.data_dir.join("fraud_cases.db")
    }

    pub fn coffee_orders_file(&self) -> PathBuf {
        self.data_dir.join("coffee_orders.json")
    }

    pub fn leads_file(&self) -> PathBuf {
        self.data_dir.join("leads.json")
    }

    pub fn tutor_progress_file(&self) -> PathBuf {
        self.data_dir.join("tutor_progress.json")
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Ok(config) => {
            log::info!("Successfully loaded API configuration");
            Ok(config)
        }
        Err(ConfigError::MissingEnvVar(var)) => {
            log::error!("Missing required environment variable: {}", var);
            log::error!("Create a .env.local file in the project root with:");
            log::error!("{}=your_api_key_here", var);
            Err(ConfigError::MissingEnvVar(var))
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            Err(e)
        }
    }
}
