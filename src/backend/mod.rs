pub mod client;
pub mod memory;

pub use client::{
    BackendError, BranchOutcome, BuildBackendClient, FlagInstruction, FlagKind, FlagStatus,
    PackageRef, RepositoryConfig, RepositoryPath,
};
pub use memory::InMemoryBackend;
