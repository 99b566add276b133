use thiserror::Error;

impl From<serde_json::Error> for PackflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::WebhookError(format!("JSON payload error: {}", err))
    }
}

impl From<serde_yaml::Error> for PackflowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigError(format!("YAML parse error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum PackflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("State machine violation: {0}")]
    StateViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No permission: {0}")]
    NoPermission(String),

    #[error("SCM error: {0}")]
    ScmError(String),

    #[error("Build backend error: {0}")]
    BackendError(String),

    #[error("Webhook processing error: {0}")]
    WebhookError(String),
}

impl PackflowError {
    /// Stable reason code surfaced in step outcomes and run response bodies.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config",
            Self::ValidationError(_) => "validation",
            Self::StateViolation(_) => "state_violation",
            Self::NotFound(_) => "not_found",
            Self::NoPermission(_) => "no_permission",
            Self::ScmError(_) => "scm",
            Self::BackendError(_) => "backend",
            Self::WebhookError(_) => "webhook",
        }
    }
}
