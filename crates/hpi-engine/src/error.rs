use crate::config::ConfigError;
use crate::intake::AnswerImportError;
use crate::scoring::{EngineError, RecommendationError, RegistryLoadError};
use crate::telemetry::TelemetryError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    Registry(RegistryLoadError),
    Import(AnswerImportError),
    Engine(EngineError),
    Recommendation(RecommendationError),
    EmptyHistory { path: PathBuf },
}

impl AppError {
    /// Errors caused by the supplied input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::Import(_)
                | AppError::Engine(_)
                | AppError::Registry(_)
                | AppError::Json(_)
                | AppError::EmptyHistory { .. }
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Csv(err) => write!(f, "csv error: {}", err),
            AppError::Registry(err) => write!(f, "registry error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Engine(err) => write!(f, "scoring error: {}", err),
            AppError::Recommendation(err) => write!(f, "recommendation error: {}", err),
            AppError::EmptyHistory { path } => {
                write!(f, "history {} holds no snapshots", path.display())
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Csv(err) => Some(err),
            AppError::Registry(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Engine(err) => Some(err),
            AppError::Recommendation(err) => Some(err),
            AppError::EmptyHistory { .. } => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<RegistryLoadError> for AppError {
    fn from(value: RegistryLoadError) -> Self {
        Self::Registry(value)
    }
}

impl From<AnswerImportError> for AppError {
    fn from(value: AnswerImportError) -> Self {
        Self::Import(value)
    }
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<RecommendationError> for AppError {
    fn from(value: RecommendationError) -> Self {
        Self::Recommendation(value)
    }
}
