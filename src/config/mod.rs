//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `PROMPTBENCH_*` environment
//! variables. The provider credentials have no defaults and are required
//! for the server binary.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::model::BatchConfig;
use crate::processor::{DEFAULT_MAX_RETRY, DEFAULT_RETRY_WAIT_SECS};
use crate::provider::DEFAULT_HF_BASE_URL;

/// Chat model used when `PROMPTBENCH_LLM_MODEL` is not set.
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

/// Embeddings model used when `PROMPTBENCH_EMBEDDINGS_MODEL` is not set.
pub const DEFAULT_EMBEDDINGS_MODEL: &str = "WhereIsAI/UAE-Large-V1";

/// Sampling temperature used when `PROMPTBENCH_TEMPERATURE` is not set.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Completion token cap used when `PROMPTBENCH_MAX_TOKENS` is not set.
pub const DEFAULT_MAX_TOKENS: u32 = 50;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `PROMPTBENCH_*` overrides on top of
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// OpenAI API key. Required by the server binary.
    pub openai_api_key: Option<String>,

    /// Hugging Face inference API token. Required by the server binary.
    pub huggingface_api_token: Option<String>,

    /// Base URL of the Hugging Face inference API.
    pub hf_base_url: String,

    /// Chat model used for candidate completions.
    pub llm_model: String,

    /// Sentence embeddings model used for scoring.
    pub embeddings_model: String,

    /// Sampling temperature for candidate completions.
    pub temperature: f32,

    /// Token cap per candidate completion.
    pub max_tokens: u32,

    /// Max provider attempts per call (first try included). Default: `4`.
    pub retry_max_attempts: u32,

    /// Seconds to wait between retryable provider failures. Default: `5`.
    pub retry_wait_secs: u64,

    /// Optional JSON file of prompts and test cases loaded at startup.
    pub seed_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            openai_api_key: None,
            huggingface_api_token: None,
            hf_base_url: DEFAULT_HF_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embeddings_model: DEFAULT_EMBEDDINGS_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            retry_max_attempts: DEFAULT_MAX_RETRY,
            retry_wait_secs: DEFAULT_RETRY_WAIT_SECS,
            seed_path: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "PROMPTBENCH_PORT";
    const ENV_BIND_ADDR: &'static str = "PROMPTBENCH_BIND_ADDR";
    const ENV_OPENAI_API_KEY: &'static str = "PROMPTBENCH_OPENAI_API_KEY";
    const ENV_HF_API_TOKEN: &'static str = "PROMPTBENCH_HF_API_TOKEN";
    const ENV_HF_BASE_URL: &'static str = "PROMPTBENCH_HF_BASE_URL";
    const ENV_LLM_MODEL: &'static str = "PROMPTBENCH_LLM_MODEL";
    const ENV_EMBEDDINGS_MODEL: &'static str = "PROMPTBENCH_EMBEDDINGS_MODEL";
    const ENV_TEMPERATURE: &'static str = "PROMPTBENCH_TEMPERATURE";
    const ENV_MAX_TOKENS: &'static str = "PROMPTBENCH_MAX_TOKENS";
    const ENV_RETRY_MAX_ATTEMPTS: &'static str = "PROMPTBENCH_RETRY_MAX_ATTEMPTS";
    const ENV_RETRY_WAIT_SECS: &'static str = "PROMPTBENCH_RETRY_WAIT_SECS";
    const ENV_SEED_PATH: &'static str = "PROMPTBENCH_SEED_PATH";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let openai_api_key = Self::parse_optional_string_from_env(Self::ENV_OPENAI_API_KEY);
        let huggingface_api_token = Self::parse_optional_string_from_env(Self::ENV_HF_API_TOKEN);
        let hf_base_url =
            Self::parse_string_from_env(Self::ENV_HF_BASE_URL, defaults.hf_base_url);
        let llm_model = Self::parse_string_from_env(Self::ENV_LLM_MODEL, defaults.llm_model);
        let embeddings_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDINGS_MODEL, defaults.embeddings_model);
        let temperature = Self::parse_f32_from_env(Self::ENV_TEMPERATURE, defaults.temperature);
        let max_tokens = Self::parse_u32_from_env(Self::ENV_MAX_TOKENS, defaults.max_tokens);
        let retry_max_attempts =
            Self::parse_u32_from_env(Self::ENV_RETRY_MAX_ATTEMPTS, defaults.retry_max_attempts);
        let retry_wait_secs =
            Self::parse_u64_from_env(Self::ENV_RETRY_WAIT_SECS, defaults.retry_wait_secs);
        let seed_path = Self::parse_optional_path_from_env(Self::ENV_SEED_PATH);

        Ok(Self {
            port,
            bind_addr,
            openai_api_key,
            huggingface_api_token,
            hf_base_url,
            llm_model,
            embeddings_model,
            temperature,
            max_tokens,
            retry_max_attempts,
            retry_wait_secs,
            seed_path,
        })
    }

    /// Validates credentials and basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_OPENAI_API_KEY,
            });
        }
        if self
            .huggingface_api_token
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_HF_API_TOKEN,
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_TEMPERATURE,
                reason: format!("{} is not within 0.0..=2.0", self.temperature),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_MAX_TOKENS,
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_RETRY_MAX_ATTEMPTS,
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(ref path) = self.seed_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    /// The generation parameters stamped onto every new batch.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            llm_model: self.llm_model.clone(),
            embeddings_model: self.embeddings_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_f32_from_env(var_name: &str, default: f32) -> f32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
