use thiserror::Error;

use crate::directory::DirectoryError;
use crate::mail::DispatchError;
use crate::telemetry::TelemetryError;
use crate::template::RenderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Inbound payload is not a valid event; the whole message is dropped.
    #[error("Event decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Subscriptions could not be fetched; the whole message is dropped.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl AppError {
    /// Short label used for log fields and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Decode(_) => "decode",
            AppError::Directory(_) => "directory",
            AppError::Render(_) => "render",
            AppError::Dispatch(_) => "dispatch",
            AppError::Bus(_) => "bus",
            AppError::Telemetry(_) => "telemetry",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_kind() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "decode");
        assert!(err.to_string().starts_with("Event decode error"));
    }

    #[test]
    fn test_dispatch_error_kind() {
        let err: AppError = DispatchError::MissingCredential.into();
        assert_eq!(err.kind(), "dispatch");
    }
}
