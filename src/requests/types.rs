use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    New,
    Review,
    Accepted,
    Declined,
    Revoked,
    Superseded,
}

impl RequestState {
    /// Terminal states accept no further actor commands except reopen,
    /// which is legal only from `Declined`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Declined | Self::Revoked | Self::Superseded
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Review => "review",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Revoked => "revoked",
            Self::Superseded => "superseded",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Moderate,
    Important,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Submit,
    Delete,
    AddRole,
    SetBugowner,
    ChangeDevel,
    MaintenanceIncident,
    MaintenanceRelease,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAction {
    pub kind: ActionKind,
    pub source_project: Option<String>,
    pub source_package: Option<String>,
    pub target_project: String,
    pub target_package: Option<String>,
}

impl RequestAction {
    pub fn submit(
        source_project: &str,
        source_package: &str,
        target_project: &str,
        target_package: &str,
    ) -> Self {
        Self {
            kind: ActionKind::Submit,
            source_project: Some(source_project.to_string()),
            source_package: Some(source_package.to_string()),
            target_project: target_project.to_string(),
            target_package: Some(target_package.to_string()),
        }
    }
}

/// One approval gate owner. Exactly one shape is set by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reviewer {
    User { login: String },
    Group { name: String },
    Project { project: String },
    Package { project: String, package: String },
}

impl Reviewer {
    /// True when the reviewer is the given project (or a package within it).
    pub fn targets(&self, project: &str, package: Option<&str>) -> bool {
        match self {
            Self::Project { project: p } => p == project && package.is_none(),
            Self::Package {
                project: p,
                package: pkg,
            } => p == project && package.map(|other| other == pkg).unwrap_or(true),
            _ => false,
        }
    }
}

impl fmt::Display for Reviewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { login } => write!(f, "user {}", login),
            Self::Group { name } => write!(f, "group {}", name),
            Self::Project { project } => write!(f, "project {}", project),
            Self::Package { project, package } => write!(f, "package {}/{}", project, package),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    New,
    Accepted,
    Declined,
    Obsoleted,
    Superseded,
}

/// Outcome an assigned reviewer may record. System-driven transitions
/// (`Obsoleted`, `Superseded`) go through dedicated operations instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: u64,
    pub reviewer: Reviewer,
    pub state: ReviewState,
    pub reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub number: u64,
    pub state: RequestState,
    pub actions: Vec<RequestAction>,
    pub creator: String,
    pub priority: Priority,
    /// A request is staged into at most one batch.
    pub staging_batch: Option<String>,
    pub reviews: Vec<ReviewAssignment>,
    pub superseded_by: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every store write.
    pub version: u64,
}
