pub mod workflows;

pub use workflows::{StepConfig, WorkflowsConfig};

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Token presented to the SCM when posting commit statuses.
    pub scm_token: String,
    /// Bounded timeout for outbound SCM calls, in seconds.
    pub scm_timeout_secs: u64,
    pub github_api_endpoint: String,
    pub gitlab_api_endpoint: String,
    /// Acting identity used for build backend mutations.
    pub workflow_actor: String,
    /// Path to the workflow step configuration file.
    pub workflows_path: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let scm_token = env::var("SCM_TOKEN").unwrap_or_default();

        let scm_timeout_secs = env::var("SCM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let github_api_endpoint = env::var("GITHUB_API_ENDPOINT")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let gitlab_api_endpoint = env::var("GITLAB_API_ENDPOINT")
            .unwrap_or_else(|_| "https://gitlab.com/api/v4".to_string());

        let workflow_actor =
            env::var("WORKFLOW_ACTOR").unwrap_or_else(|_| "packflow-bot".to_string());

        let workflows_path =
            env::var("WORKFLOWS_PATH").unwrap_or_else(|_| "workflows.yml".to_string());

        Ok(AppConfig {
            server_host,
            server_port,
            scm_token,
            scm_timeout_secs,
            github_api_endpoint,
            gitlab_api_endpoint,
            workflow_actor,
            workflows_path,
        })
    }
}
