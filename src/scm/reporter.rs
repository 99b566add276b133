//! Commit status reporting back to the SCM.
//!
//! The reporter is the only outbound SCM surface in this core. Calls carry
//! a bounded timeout so a slow provider cannot stall webhook processing,
//! and an unauthorized response is surfaced as non-retryable so the run can
//! tell the operator to rotate the credential.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::PackflowError;
use crate::scm::envelope::{Envelope, ScmProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_github_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }

    /// GitLab has no separate error state.
    pub fn as_gitlab_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure | Self::Error => "failed",
        }
    }
}

#[derive(Error, Debug)]
pub enum ReporterError {
    /// Non-retryable; the stored SCM credential must be rotated.
    #[error("SCM rejected the credential: {0}")]
    Unauthorized(String),

    #[error("SCM status post failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(
        &self,
        envelope: &Envelope,
        state: CommitState,
        context: &str,
        target_url: Option<&str>,
    ) -> Result<(), ReporterError>;
}

pub struct HttpStatusReporter {
    http: reqwest::Client,
    token: String,
}

impl HttpStatusReporter {
    pub fn new(token: &str, timeout_secs: u64) -> Result<Self, PackflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PackflowError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token: token.to_string(),
        })
    }

    fn status_url(&self, envelope: &Envelope) -> String {
        let endpoint = envelope.api_endpoint.trim_end_matches('/');
        match envelope.scm {
            ScmProvider::Github => format!(
                "{}/repos/{}/statuses/{}",
                endpoint, envelope.target_repository_full_name, envelope.commit_sha
            ),
            ScmProvider::Gitlab => format!(
                "{}/projects/{}/statuses/{}",
                endpoint,
                envelope.target_repository_full_name.replace('/', "%2F"),
                envelope.commit_sha
            ),
        }
    }
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
    async fn report(
        &self,
        envelope: &Envelope,
        state: CommitState,
        context: &str,
        target_url: Option<&str>,
    ) -> Result<(), ReporterError> {
        let url = self.status_url(envelope);
        let body = match envelope.scm {
            ScmProvider::Github => json!({
                "state": state.as_github_str(),
                "context": context,
                "target_url": target_url,
            }),
            ScmProvider::Gitlab => json!({
                "state": state.as_gitlab_str(),
                "name": context,
                "target_url": target_url,
            }),
        };

        let request = match envelope.scm {
            ScmProvider::Github => self
                .http
                .post(&url)
                .header("Authorization", format!("token {}", self.token))
                .header("User-Agent", "packflow"),
            ScmProvider::Gitlab => self.http.post(&url).header("PRIVATE-TOKEN", &self.token),
        };

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ReporterError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!("SCM rejected credential posting status to {}", url);
            return Err(ReporterError::Unauthorized(format!(
                "{} returned {}",
                url, status
            )));
        }
        if !status.is_success() {
            return Err(ReporterError::Transport(format!(
                "{} returned {}",
                url, status
            )));
        }

        debug!(
            "Posted {} status for {} ({})",
            state.as_github_str(),
            envelope.commit_sha,
            context
        );
        Ok(())
    }
}
