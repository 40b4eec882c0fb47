//! Error types for the gateway monitor

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP client could not be built
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Metric registration or encoding failed
    Metrics(prometheus::Error),

    /// Gateway configuration file missing, unreadable or malformed
    Config { path: PathBuf, reason: String },

    /// Dashboard file could not be rendered or written
    Render { path: PathBuf, reason: String },

    /// Invalid runtime settings
    Settings(String),

    /// Metrics server failed to bind or run
    Server(String),
}

impl MonitorError {
    pub fn config(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        MonitorError::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn render(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        MonitorError::Render {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Metrics(err) => write!(f, "Metrics error: {}", err),
            MonitorError::Config { path, reason } => {
                write!(f, "Configuration error in {}: {}", path.display(), reason)
            }
            MonitorError::Render { path, reason } => {
                write!(f, "Dashboard render error for {}: {}", path.display(), reason)
            }
            MonitorError::Settings(msg) => write!(f, "Invalid settings: {}", msg),
            MonitorError::Server(msg) => write!(f, "Metrics server error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Metrics(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<prometheus::Error> for MonitorError {
    fn from(err: prometheus::Error) -> Self {
        MonitorError::Metrics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = MonitorError::config("config/gateways.json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Configuration error in config/gateways.json: expected value at line 1"
        );
    }

    #[test]
    fn test_io_error_source() {
        let err: MonitorError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("IO error"));
    }
}
