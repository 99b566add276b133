//! Workflow step configuration loader.
//!
//! A workflow file declares the ordered list of automation steps applied to
//! every incoming SCM event. Loaded once at startup and validated before any
//! webhook is processed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::backend::{FlagInstruction, RepositoryConfig};
use crate::error::PackflowError;

/// Architectures the build backend knows how to schedule.
pub const KNOWN_ARCHITECTURES: &[&str] = &[
    "x86_64", "i586", "aarch64", "armv7l", "ppc64le", "s390x", "riscv64",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowsConfig {
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepConfig {
    BranchPackage(BranchStepConfig),
    LinkPackage(LinkStepConfig),
    ConfigureRepositories(ConfigureRepositoriesConfig),
    RebuildPackage(RebuildStepConfig),
    SetFlags(SetFlagsConfig),
    SubmitRequest(SubmitRequestConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BranchStepConfig {
    pub source_project: String,
    pub source_package: String,
    /// Prefix under which per-event target projects are created.
    pub target_project: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkStepConfig {
    pub source_project: String,
    pub source_package: String,
    pub target_project: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigureRepositoriesConfig {
    pub target_project: String,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RebuildStepConfig {
    pub project: String,
    pub package: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetFlagsConfig {
    pub flags: Vec<FlagConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagConfig {
    pub project: String,
    pub package: String,
    #[serde(flatten)]
    pub flag: FlagInstruction,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitRequestConfig {
    pub source_project: String,
    pub source_package: String,
    pub target_project: String,
    /// Defaults to the source package name when absent.
    pub target_package: Option<String>,
    pub description: Option<String>,
}

impl StepConfig {
    /// Step kind label used in run outcomes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BranchPackage(_) => "branch_package",
            Self::LinkPackage(_) => "link_package",
            Self::ConfigureRepositories(_) => "configure_repositories",
            Self::RebuildPackage(_) => "rebuild_package",
            Self::SetFlags(_) => "set_flags",
            Self::SubmitRequest(_) => "submit_request",
        }
    }
}

impl WorkflowsConfig {
    /// Load a workflow file and validate it.
    pub fn load(path: &Path) -> Result<Self, PackflowError> {
        if !path.exists() {
            return Err(PackflowError::ConfigError(format!(
                "Workflow file not found: {:?}",
                path
            )));
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            PackflowError::ConfigError(format!("Failed to read {:?}: {}", path, e))
        })?;

        let config: WorkflowsConfig = serde_yaml::from_str(&contents).map_err(|e| {
            PackflowError::ConfigError(format!("Failed to parse {:?}: {}", path, e))
        })?;

        config.validate()?;
        info!("Loaded {} workflow steps from {:?}", config.steps.len(), path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PackflowError> {
        if self.steps.is_empty() {
            return Err(PackflowError::ConfigError(
                "No workflow steps defined".to_string(),
            ));
        }

        for step in &self.steps {
            match step {
                StepConfig::BranchPackage(cfg) => {
                    Self::require(&cfg.source_project, "branch_package.source_project")?;
                    Self::require(&cfg.source_package, "branch_package.source_package")?;
                    Self::require(&cfg.target_project, "branch_package.target_project")?;
                }
                StepConfig::LinkPackage(cfg) => {
                    Self::require(&cfg.source_project, "link_package.source_project")?;
                    Self::require(&cfg.source_package, "link_package.source_package")?;
                    Self::require(&cfg.target_project, "link_package.target_project")?;
                }
                StepConfig::ConfigureRepositories(cfg) => {
                    Self::require(
                        &cfg.target_project,
                        "configure_repositories.target_project",
                    )?;
                    if cfg.repositories.is_empty() {
                        return Err(PackflowError::ConfigError(
                            "configure_repositories: no repositories defined".to_string(),
                        ));
                    }
                    for repo in &cfg.repositories {
                        Self::require(&repo.name, "configure_repositories.repositories.name")?;
                        if repo.paths.is_empty() {
                            return Err(PackflowError::ConfigError(format!(
                                "Repository {}: no build paths defined",
                                repo.name
                            )));
                        }
                        if repo.architectures.is_empty() {
                            return Err(PackflowError::ConfigError(format!(
                                "Repository {}: no architectures defined",
                                repo.name
                            )));
                        }
                        for arch in &repo.architectures {
                            if !KNOWN_ARCHITECTURES.contains(&arch.as_str()) {
                                return Err(PackflowError::ConfigError(format!(
                                    "Repository {}: unknown architecture {}",
                                    repo.name, arch
                                )));
                            }
                        }
                    }
                }
                StepConfig::RebuildPackage(cfg) => {
                    Self::require(&cfg.project, "rebuild_package.project")?;
                    Self::require(&cfg.package, "rebuild_package.package")?;
                }
                StepConfig::SetFlags(cfg) => {
                    if cfg.flags.is_empty() {
                        return Err(PackflowError::ConfigError(
                            "set_flags: no flags defined".to_string(),
                        ));
                    }
                    for flag in &cfg.flags {
                        Self::require(&flag.project, "set_flags.flags.project")?;
                        Self::require(&flag.package, "set_flags.flags.package")?;
                        if let Some(arch) = &flag.flag.architecture {
                            if !KNOWN_ARCHITECTURES.contains(&arch.as_str()) {
                                return Err(PackflowError::ConfigError(format!(
                                    "set_flags: unknown architecture {}",
                                    arch
                                )));
                            }
                        }
                    }
                }
                StepConfig::SubmitRequest(cfg) => {
                    Self::require(&cfg.source_project, "submit_request.source_project")?;
                    Self::require(&cfg.source_package, "submit_request.source_package")?;
                    Self::require(&cfg.target_project, "submit_request.target_project")?;
                }
            }
        }

        Ok(())
    }

    fn require(value: &str, field: &str) -> Result<(), PackflowError> {
        if value.trim().is_empty() {
            return Err(PackflowError::ConfigError(format!(
                "Missing required field: {}",
                field
            )));
        }
        Ok(())
    }
}
