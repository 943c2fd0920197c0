use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::llm_providers::LlmProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete engine configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub provider: ProviderConfig,
    pub quota: QuotaConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// External content provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LlmProviderType,
    pub model: Option<String>,
}

/// Daily/monthly call budget configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    pub daily: u32,
    pub monthly: u32,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl EngineConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading engine configuration from environment variables");

        let config = EngineConfig {
            provider: ProviderConfig::from_env()?,
            quota: QuotaConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            api_key_masked = %mask_sensitive_data(&self.provider.api_key),
            provider = ?self.provider.provider,
            model = ?self.provider.model,
            daily_quota = self.quota.daily,
            monthly_quota = self.quota.monthly,
            data_dir = %self.storage.data_dir,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.quota.daily == 0 {
            return Err(anyhow!("DAILY_QUOTA must be greater than 0"));
        }
        if self.quota.monthly < self.quota.daily {
            return Err(anyhow!(
                "MONTHLY_QUOTA ({}) must be at least DAILY_QUOTA ({})",
                self.quota.monthly,
                self.quota.daily
            ));
        }

        if self.storage.data_dir.is_empty() {
            return Err(anyhow!("DATA_DIR must not be empty"));
        }

        if self.provider.api_key.is_empty() || self.provider.api_key == "your-api-key" {
            warn!("Provider API key appears to be placeholder or empty - AI generation will fall back to offline mode");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|lvl| self.logging.level.to_lowercase().starts_with(lvl))
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl ProviderConfig {
    fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY").unwrap_or_else(|_| "your-api-key".to_string());
        let base_url = env::var("LLM_BASE_URL").ok();

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" | "google" => LlmProviderType::Gemini,
            "openai" | "chatgpt" | "gpt" => LlmProviderType::OpenAi,
            _ => {
                info!("Unknown LLM provider '{}', defaulting to OpenAI", provider_str);
                LlmProviderType::OpenAi
            }
        };

        let model = env::var("LLM_MODEL").ok();

        Ok(ProviderConfig {
            api_key,
            base_url,
            provider,
            model,
        })
    }
}

impl QuotaConfig {
    fn from_env() -> Result<Self> {
        let daily = parse_quota_var("DAILY_QUOTA", 50)?;
        let monthly = parse_quota_var("MONTHLY_QUOTA", 1000)?;
        Ok(QuotaConfig { daily, monthly })
    }
}

fn parse_quota_var(name: &str, default: u32) -> Result<u32> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'. Must be a non-negative number", name, raw)),
        Err(_) => Ok(default),
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self> {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Ok(StorageConfig { data_dir })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,study_engine=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}
