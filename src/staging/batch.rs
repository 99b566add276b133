use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checks::BuildTarget;

/// A named grouping of change requests tested together before acceptance.
///
/// The batch itself is not stateful beyond membership; its overall state is
/// derived on demand by the aggregator, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingBatch {
    pub name: String,
    /// Target container project owning the build targets below.
    pub container_project: String,
    pub targets: Vec<BuildTarget>,
    pub staged_requests: Vec<u64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Empty,
    Unacceptable,
    Testing,
    Failed,
    Acceptable,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Unacceptable => "unacceptable",
            Self::Testing => "testing",
            Self::Failed => "failed",
            Self::Acceptable => "acceptable",
        };
        write!(f, "{}", name)
    }
}
