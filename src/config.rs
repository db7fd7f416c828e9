//! Configuration management for the forecasting service

use crate::eligibility::EligibilityPolicy;
use crate::pipeline::DEFAULT_HORIZON;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub eligibility: EligibilityPolicy,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming forecast requests
    pub request_subject: String,
    /// Subject for decisions when a request carries no reply inbox
    pub decision_subject: String,
}

/// Sales model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX regression model
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Transaction history source
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Monthly transactions CSV
    pub history_path: String,
}

/// Forecast configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Months to forecast per request
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

fn default_horizon() -> usize {
    DEFAULT_HORIZON
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, overridden by
    /// `FORECASTER__SECTION__KEY` environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FORECASTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.forecast.horizon == 0 {
            anyhow::bail!("forecast.horizon must be positive");
        }
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be positive");
        }
        if self.eligibility.fee <= -1.0 {
            anyhow::bail!("eligibility.fee must be greater than -1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "forecast.requests".to_string(),
                decision_subject: "forecast.decisions".to_string(),
            },
            model: ModelConfig {
                path: "models/sales_model.onnx".to_string(),
                onnx_threads: default_onnx_threads(),
            },
            data: DataConfig {
                history_path: "data/monthly_transactions.csv".to_string(),
            },
            forecast: ForecastConfig::default(),
            eligibility: EligibilityPolicy::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "forecast.requests");
        assert_eq!(config.forecast.horizon, 6);
        assert_eq!(config.eligibility.fee, 0.15);
        assert_eq!(config.eligibility.holdback, 0.10);
        assert_eq!(config.eligibility.threshold, 30_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = AppConfig::load_from_path(path).unwrap();

        assert_eq!(config.nats.decision_subject, "forecast.decisions");
        assert_eq!(config.model.onnx_threads, 1);
        assert_eq!(config.forecast.horizon, 6);
        assert_eq!(config.eligibility.threshold, 30_000.0);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.forecast.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());
    }
}
