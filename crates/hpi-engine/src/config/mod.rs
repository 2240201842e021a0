use crate::scoring::{MetricRegistry, RegistryLoadError, TrendConfig, DEFAULT_EPSILON, DEFAULT_ROLLING_WINDOW};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for engine front-ends.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub scoring: ScoringConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("HPI_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let epsilon = match env::var("HPI_TREND_EPSILON") {
            Ok(value) => parse_epsilon(&value)?,
            Err(_) => DEFAULT_EPSILON,
        };
        let rolling_window = match env::var("HPI_ROLLING_WINDOW") {
            Ok(value) => parse_rolling_window(&value)?,
            Err(_) => DEFAULT_ROLLING_WINDOW,
        };
        let registry_path = env::var("HPI_REGISTRY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var("HPI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            scoring: ScoringConfig {
                trend: TrendConfig {
                    epsilon,
                    rolling_window,
                },
                registry_path,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Trend tuning and the registry source.
#[derive(Debug, Clone, Default)]
pub struct ScoringConfig {
    pub trend: TrendConfig,
    /// JSON registry replacing the built-in standard one.
    pub registry_path: Option<PathBuf>,
}

impl ScoringConfig {
    pub fn registry(&self) -> Result<MetricRegistry, RegistryLoadError> {
        match &self.registry_path {
            Some(path) => MetricRegistry::from_path(path),
            None => Ok(MetricRegistry::standard()),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

pub fn parse_epsilon(value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|epsilon| epsilon.is_finite() && *epsilon >= 0.0)
        .ok_or_else(|| ConfigError::InvalidEpsilon {
            value: value.to_string(),
        })
}

pub fn parse_rolling_window(value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|window| *window >= 1)
        .ok_or_else(|| ConfigError::InvalidRollingWindow {
            value: value.to_string(),
        })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidEpsilon { value: String },
    InvalidRollingWindow { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEpsilon { value } => write!(
                f,
                "HPI_TREND_EPSILON must be a finite, non-negative number (got '{}')",
                value
            ),
            ConfigError::InvalidRollingWindow { value } => write!(
                f,
                "HPI_ROLLING_WINDOW must be a positive integer (got '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("HPI_ENV");
        env::remove_var("HPI_LOG_LEVEL");
        env::remove_var("HPI_TREND_EPSILON");
        env::remove_var("HPI_ROLLING_WINDOW");
        env::remove_var("HPI_REGISTRY_PATH");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.scoring.trend, TrendConfig::default());
        assert!(config.scoring.registry_path.is_none());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_trend_tuning_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HPI_ENV", "CI");
        env::set_var("HPI_TREND_EPSILON", "0.5");
        env::set_var("HPI_ROLLING_WINDOW", " 5 ");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.scoring.trend.epsilon, 0.5);
        assert_eq!(config.scoring.trend.rolling_window, 5);
    }

    #[test]
    fn rejects_invalid_trend_tuning() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HPI_ROLLING_WINDOW", "0");
        let err = AppConfig::load().expect_err("zero window rejected");
        assert!(matches!(err, ConfigError::InvalidRollingWindow { .. }));

        reset_env();
        env::set_var("HPI_TREND_EPSILON", "-1");
        let err = AppConfig::load().expect_err("negative epsilon rejected");
        assert!(err.to_string().contains("HPI_TREND_EPSILON"));
        reset_env();
    }

    #[test]
    fn registry_defaults_to_standard() {
        let scoring = ScoringConfig::default();
        let registry = scoring.registry().expect("standard registry");
        assert_eq!(registry.version, "standard-v1");
    }

    #[test]
    fn missing_registry_file_is_reported() {
        let scoring = ScoringConfig {
            registry_path: Some(PathBuf::from("/nonexistent/hpi-registry.json")),
            ..ScoringConfig::default()
        };
        assert!(matches!(scoring.registry(), Err(RegistryLoadError::Io(_))));
    }
}
