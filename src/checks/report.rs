use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One buildable unit owned by a staging container: a repository of a
/// project, optionally narrowed to a single architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTarget {
    pub project: String,
    pub repository: String,
    pub architecture: Option<String>,
}

impl BuildTarget {
    pub fn new(project: &str, repository: &str, architecture: Option<&str>) -> Self {
        Self {
            project: project.to_string(),
            repository: repository.to_string(),
            architecture: architecture.map(str::to_string),
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.architecture {
            Some(arch) => write!(f, "{}/{}/{}", self.project, self.repository, arch),
            None => write!(f, "{}/{}", self.project, self.repository),
        }
    }
}

/// Identity of one build of one target. The uuid changes every time the
/// target rebuilds, which is how stale check results are detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub target: BuildTarget,
    pub uuid: String,
    pub required_checks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub report_uuid: String,
    pub name: String,
    pub state: CheckState,
    pub details: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Resolves the current build identity of a target. Implemented by the
/// build backend; the aggregator only ever sees the latest uuid, so results
/// recorded against superseded builds fall out of scope on their own.
#[async_trait]
pub trait PublishReportResolver: Send + Sync {
    async fn current_report(&self, target: &BuildTarget) -> Option<PublishReport>;
}
