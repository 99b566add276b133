//! Build backend client interface.
//!
//! The backend owning projects, packages and build scheduling is an
//! external system reached over RPC; this trait is the explicit seam the
//! automation steps work against. Every mutating call threads the acting
//! identity so the backend can enforce its own permissions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    pub project: String,
    pub package: String,
}

impl PackageRef {
    pub fn new(project: &str, package: &str) -> Self {
        Self {
            project: project.to_string(),
            package: package.to_string(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.package)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPath {
    pub target_project: String,
    pub target_repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub paths: Vec<RepositoryPath>,
    pub architectures: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Build,
    Publish,
    Debuginfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagInstruction {
    #[serde(rename = "type")]
    pub kind: FlagKind,
    pub status: FlagStatus,
    pub repository: Option<String>,
    pub architecture: Option<String>,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no permission: {0}")]
    NoPermission(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend transport error: {0}")]
    Transport(String),
}

/// Result of a branch call. Re-branching the same source into the same
/// target is not an error; the step proceeds as if it had just branched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    Created,
    ReusedExisting,
}

#[async_trait]
pub trait BuildBackendClient: Send + Sync {
    async fn package_exists(&self, pkg: &PackageRef) -> Result<bool, BackendError>;

    /// The origin recorded when `pkg` was created by branching, if any.
    async fn branch_origin(&self, pkg: &PackageRef) -> Result<Option<PackageRef>, BackendError>;

    /// Branch `source` into `target`, creating the target project on
    /// demand. Looks up before creating: an existing branch of the same
    /// source is reused, a target branched from elsewhere is a conflict.
    async fn branch_package(
        &self,
        actor: &str,
        source: &PackageRef,
        target: &PackageRef,
    ) -> Result<BranchOutcome, BackendError>;

    /// Create an empty package, reusing it when it already exists.
    async fn create_package(&self, actor: &str, target: &PackageRef)
        -> Result<(), BackendError>;

    /// Write a link file in `target` pointing at `source`.
    async fn write_link(
        &self,
        actor: &str,
        source: &PackageRef,
        target: &PackageRef,
    ) -> Result<(), BackendError>;

    /// Write or refresh the marker recording what an automated target was
    /// created for.
    async fn write_branch_marker(&self, target: &PackageRef, note: &str)
        -> Result<(), BackendError>;

    /// Soft-delete: the project disappears from lookups but can be
    /// restored with its contents intact.
    async fn soft_delete_project(&self, actor: &str, project: &str) -> Result<(), BackendError>;

    async fn restore_project(&self, actor: &str, project: &str) -> Result<(), BackendError>;

    /// Create or update the repository and architecture associations of a
    /// project to exactly the given set.
    async fn configure_repositories(
        &self,
        actor: &str,
        project: &str,
        repositories: &[RepositoryConfig],
    ) -> Result<(), BackendError>;

    async fn remove_repositories(
        &self,
        actor: &str,
        project: &str,
        names: &[String],
    ) -> Result<(), BackendError>;

    async fn repositories(&self, project: &str) -> Result<Vec<RepositoryConfig>, BackendError>;

    async fn set_flag(
        &self,
        actor: &str,
        pkg: &PackageRef,
        flag: &FlagInstruction,
    ) -> Result<(), BackendError>;

    /// Trigger a rebuild; the backend assigns a fresh publish uuid once the
    /// rebuild publishes.
    async fn rebuild(&self, actor: &str, pkg: &PackageRef) -> Result<(), BackendError>;
}
