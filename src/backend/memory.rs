//! In-memory build backend.
//!
//! Backs the server when no real backend is wired and doubles as the test
//! double. All mutations are lookup-then-create-or-reuse under one write
//! lock, so two concurrent deliveries racing to create the same target
//! converge: the loser observes the winner's row and reuses it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::client::{
    BackendError, BranchOutcome, BuildBackendClient, FlagInstruction, PackageRef,
    RepositoryConfig,
};
use crate::checks::{BuildTarget, PublishReport, PublishReportResolver};

#[derive(Debug, Clone, Default)]
struct PackageEntry {
    /// Set when the package was created by branching.
    origin: Option<PackageRef>,
    link: Option<PackageRef>,
    marker: Option<String>,
    flags: Vec<FlagInstruction>,
    rebuild_count: u64,
}

#[derive(Debug, Clone, Default)]
struct ProjectEntry {
    packages: HashMap<String, PackageEntry>,
    repositories: Vec<RepositoryConfig>,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct PublishState {
    uuid: String,
    required_checks: Vec<String>,
}

pub struct InMemoryBackend {
    projects: RwLock<HashMap<String, ProjectEntry>>,
    publish: RwLock<HashMap<BuildTarget, PublishState>>,
    /// Projects no workflow actor may touch; mutations fail with
    /// `NoPermission`.
    protected: RwLock<HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            publish: RwLock::new(HashMap::new()),
            protected: RwLock::new(HashSet::new()),
        }
    }

    /// Seed a source project + package, used at startup and by tests.
    pub async fn seed_package(&self, pkg: &PackageRef) {
        let mut projects = self.projects.write().await;
        projects
            .entry(pkg.project.clone())
            .or_default()
            .packages
            .entry(pkg.package.clone())
            .or_default();
    }

    pub async fn protect_project(&self, project: &str) {
        let mut protected = self.protected.write().await;
        protected.insert(project.to_string());
    }

    /// Record the current publish identity of a target, replacing any
    /// previous uuid. Returns the new uuid.
    pub async fn set_publish_state(
        &self,
        target: &BuildTarget,
        required_checks: Vec<String>,
    ) -> String {
        let uuid = Uuid::new_v4().to_string();
        let mut publish = self.publish.write().await;
        publish.insert(
            target.clone(),
            PublishState {
                uuid: uuid.clone(),
                required_checks,
            },
        );
        uuid
    }

    pub async fn project_exists(&self, project: &str) -> bool {
        let projects = self.projects.read().await;
        projects.get(project).map(|p| !p.deleted).unwrap_or(false)
    }

    pub async fn is_project_deleted(&self, project: &str) -> bool {
        let projects = self.projects.read().await;
        projects.get(project).map(|p| p.deleted).unwrap_or(false)
    }

    pub async fn marker_for(&self, pkg: &PackageRef) -> Option<String> {
        let projects = self.projects.read().await;
        projects
            .get(&pkg.project)
            .and_then(|p| p.packages.get(&pkg.package))
            .and_then(|entry| entry.marker.clone())
    }

    pub async fn link_for(&self, pkg: &PackageRef) -> Option<PackageRef> {
        let projects = self.projects.read().await;
        projects
            .get(&pkg.project)
            .and_then(|p| p.packages.get(&pkg.package))
            .and_then(|entry| entry.link.clone())
    }

    pub async fn flags_for(&self, pkg: &PackageRef) -> Vec<FlagInstruction> {
        let projects = self.projects.read().await;
        projects
            .get(&pkg.project)
            .and_then(|p| p.packages.get(&pkg.package))
            .map(|entry| entry.flags.clone())
            .unwrap_or_default()
    }

    pub async fn rebuild_count(&self, pkg: &PackageRef) -> u64 {
        let projects = self.projects.read().await;
        projects
            .get(&pkg.project)
            .and_then(|p| p.packages.get(&pkg.package))
            .map(|entry| entry.rebuild_count)
            .unwrap_or(0)
    }

    async fn check_permission(&self, actor: &str, project: &str) -> Result<(), BackendError> {
        let protected = self.protected.read().await;
        if protected.contains(project) {
            return Err(BackendError::NoPermission(format!(
                "{} may not modify project {}",
                actor, project
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildBackendClient for InMemoryBackend {
    async fn package_exists(&self, pkg: &PackageRef) -> Result<bool, BackendError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&pkg.project)
            .filter(|p| !p.deleted)
            .map(|p| p.packages.contains_key(&pkg.package))
            .unwrap_or(false))
    }

    async fn branch_origin(&self, pkg: &PackageRef) -> Result<Option<PackageRef>, BackendError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(&pkg.project)
            .and_then(|p| p.packages.get(&pkg.package))
            .and_then(|entry| entry.origin.clone()))
    }

    async fn branch_package(
        &self,
        actor: &str,
        source: &PackageRef,
        target: &PackageRef,
    ) -> Result<BranchOutcome, BackendError> {
        self.check_permission(actor, &source.project).await?;
        self.check_permission(actor, &target.project).await?;

        let mut projects = self.projects.write().await;

        let source_ok = projects
            .get(&source.project)
            .filter(|p| !p.deleted)
            .map(|p| p.packages.contains_key(&source.package))
            .unwrap_or(false);
        if !source_ok {
            return Err(BackendError::NotFound(format!("source package {}", source)));
        }

        let project = projects.entry(target.project.clone()).or_default();
        if let Some(existing) = project.packages.get(&target.package) {
            return match &existing.origin {
                Some(origin) if origin == source => {
                    debug!("Target {} already branched from {}, reusing", target, source);
                    Ok(BranchOutcome::ReusedExisting)
                }
                Some(origin) => Err(BackendError::Conflict(format!(
                    "{} is already a branch of {}",
                    target, origin
                ))),
                None => Err(BackendError::Conflict(format!(
                    "{} exists and is not a branch",
                    target
                ))),
            };
        }

        project.packages.insert(
            target.package.clone(),
            PackageEntry {
                origin: Some(source.clone()),
                ..Default::default()
            },
        );
        info!("{} branched {} into {}", actor, source, target);
        Ok(BranchOutcome::Created)
    }

    async fn create_package(
        &self,
        actor: &str,
        target: &PackageRef,
    ) -> Result<(), BackendError> {
        self.check_permission(actor, &target.project).await?;

        let mut projects = self.projects.write().await;
        let project = projects.entry(target.project.clone()).or_default();
        project.packages.entry(target.package.clone()).or_default();
        Ok(())
    }

    async fn write_link(
        &self,
        actor: &str,
        source: &PackageRef,
        target: &PackageRef,
    ) -> Result<(), BackendError> {
        self.check_permission(actor, &target.project).await?;

        let mut projects = self.projects.write().await;

        let source_ok = projects
            .get(&source.project)
            .filter(|p| !p.deleted)
            .map(|p| p.packages.contains_key(&source.package))
            .unwrap_or(false);
        if !source_ok {
            return Err(BackendError::NotFound(format!("source package {}", source)));
        }

        let entry = projects
            .get_mut(&target.project)
            .and_then(|p| p.packages.get_mut(&target.package))
            .ok_or_else(|| BackendError::NotFound(format!("target package {}", target)))?;
        entry.link = Some(source.clone());
        Ok(())
    }

    async fn write_branch_marker(
        &self,
        target: &PackageRef,
        note: &str,
    ) -> Result<(), BackendError> {
        let mut projects = self.projects.write().await;
        let entry = projects
            .get_mut(&target.project)
            .and_then(|p| p.packages.get_mut(&target.package))
            .ok_or_else(|| BackendError::NotFound(format!("target package {}", target)))?;
        entry.marker = Some(note.to_string());
        Ok(())
    }

    async fn soft_delete_project(&self, actor: &str, project: &str) -> Result<(), BackendError> {
        self.check_permission(actor, project).await?;

        let mut projects = self.projects.write().await;
        let entry = projects
            .get_mut(project)
            .ok_or_else(|| BackendError::NotFound(format!("project {}", project)))?;
        entry.deleted = true;
        info!("{} soft-deleted project {}", actor, project);
        Ok(())
    }

    async fn restore_project(&self, actor: &str, project: &str) -> Result<(), BackendError> {
        self.check_permission(actor, project).await?;

        let mut projects = self.projects.write().await;
        let entry = projects
            .get_mut(project)
            .ok_or_else(|| BackendError::NotFound(format!("project {}", project)))?;
        entry.deleted = false;
        info!("{} restored project {}", actor, project);
        Ok(())
    }

    async fn configure_repositories(
        &self,
        actor: &str,
        project: &str,
        repositories: &[RepositoryConfig],
    ) -> Result<(), BackendError> {
        self.check_permission(actor, project).await?;

        let mut projects = self.projects.write().await;
        let entry = projects.entry(project.to_string()).or_default();
        for repo in repositories {
            entry.repositories.retain(|r| r.name != repo.name);
            entry.repositories.push(repo.clone());
        }
        Ok(())
    }

    async fn remove_repositories(
        &self,
        actor: &str,
        project: &str,
        names: &[String],
    ) -> Result<(), BackendError> {
        self.check_permission(actor, project).await?;

        let mut projects = self.projects.write().await;
        if let Some(entry) = projects.get_mut(project) {
            entry.repositories.retain(|r| !names.contains(&r.name));
        }
        Ok(())
    }

    async fn repositories(&self, project: &str) -> Result<Vec<RepositoryConfig>, BackendError> {
        let projects = self.projects.read().await;
        Ok(projects
            .get(project)
            .map(|p| p.repositories.clone())
            .unwrap_or_default())
    }

    async fn set_flag(
        &self,
        actor: &str,
        pkg: &PackageRef,
        flag: &FlagInstruction,
    ) -> Result<(), BackendError> {
        self.check_permission(actor, &pkg.project).await?;

        let mut projects = self.projects.write().await;
        let entry = projects
            .get_mut(&pkg.project)
            .and_then(|p| p.packages.get_mut(&pkg.package))
            .ok_or_else(|| BackendError::NotFound(format!("package {}", pkg)))?;
        entry
            .flags
            .retain(|f| !(f.kind == flag.kind && f.repository == flag.repository && f.architecture == flag.architecture));
        entry.flags.push(flag.clone());
        Ok(())
    }

    async fn rebuild(&self, actor: &str, pkg: &PackageRef) -> Result<(), BackendError> {
        self.check_permission(actor, &pkg.project).await?;

        {
            let mut projects = self.projects.write().await;
            let entry = projects
                .get_mut(&pkg.project)
                .and_then(|p| p.packages.get_mut(&pkg.package))
                .ok_or_else(|| BackendError::NotFound(format!("package {}", pkg)))?;
            entry.rebuild_count += 1;
        }

        // A rebuild supersedes previous publish identities of the project's
        // targets; results recorded against the old uuid go stale.
        let mut publish = self.publish.write().await;
        for (target, state) in publish.iter_mut() {
            if target.project == pkg.project {
                state.uuid = Uuid::new_v4().to_string();
            }
        }
        info!("{} triggered rebuild of {}", actor, pkg);
        Ok(())
    }
}

#[async_trait]
impl PublishReportResolver for InMemoryBackend {
    async fn current_report(&self, target: &BuildTarget) -> Option<PublishReport> {
        let publish = self.publish.read().await;
        publish.get(target).map(|state| PublishReport {
            target: target.clone(),
            uuid: state.uuid.clone(),
            required_checks: state.required_checks.clone(),
        })
    }
}
