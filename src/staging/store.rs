//! Staging batch membership store.
//!
//! Keeps the 0..1 relation between a request and its batch consistent with
//! the request records themselves: staging and unstaging write both sides.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use crate::checks::BuildTarget;
use crate::error::PackflowError;
use crate::requests::RequestStore;
use crate::staging::batch::StagingBatch;

pub struct StagingStore {
    batches: RwLock<HashMap<String, StagingBatch>>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(
        &self,
        name: &str,
        container_project: &str,
        targets: Vec<BuildTarget>,
        created_by: &str,
    ) -> Result<StagingBatch, PackflowError> {
        let mut batches = self.batches.write().await;
        if batches.contains_key(name) {
            return Err(PackflowError::ValidationError(format!(
                "Staging batch {} already exists",
                name
            )));
        }

        let batch = StagingBatch {
            name: name.to_string(),
            container_project: container_project.to_string(),
            targets,
            staged_requests: Vec::new(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        batches.insert(name.to_string(), batch.clone());
        info!("Created staging batch {} by {}", name, created_by);
        Ok(batch)
    }

    pub async fn get(&self, name: &str) -> Option<StagingBatch> {
        let batches = self.batches.read().await;
        batches.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<StagingBatch> {
        let batches = self.batches.read().await;
        let mut list: Vec<StagingBatch> = batches.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Destroy a batch. Only legal once every request has been unstaged.
    pub async fn delete(&self, name: &str) -> Result<(), PackflowError> {
        let mut batches = self.batches.write().await;
        let batch = batches
            .get(name)
            .ok_or_else(|| PackflowError::NotFound(format!("Staging batch {}", name)))?;
        if !batch.staged_requests.is_empty() {
            return Err(PackflowError::ValidationError(format!(
                "Staging batch {} still holds {} requests",
                name,
                batch.staged_requests.len()
            )));
        }
        batches.remove(name);
        Ok(())
    }

    /// Attach a request to a batch. A request is staged into at most one
    /// batch at a time.
    pub async fn stage_request(
        &self,
        name: &str,
        number: u64,
        requests: &RequestStore,
    ) -> Result<(), PackflowError> {
        {
            let batches = self.batches.read().await;
            if !batches.contains_key(name) {
                return Err(PackflowError::NotFound(format!("Staging batch {}", name)));
            }
        }

        requests
            .update(number, |request| {
                if request.state.is_terminal() {
                    return Err(PackflowError::StateViolation(format!(
                        "Cannot stage request {} in state {}",
                        request.number, request.state
                    )));
                }
                if let Some(existing) = &request.staging_batch {
                    return Err(PackflowError::ValidationError(format!(
                        "Request {} is already staged in {}",
                        request.number, existing
                    )));
                }
                request.staging_batch = Some(name.to_string());
                Ok(())
            })
            .await?;

        let mut batches = self.batches.write().await;
        let batch = batches
            .get_mut(name)
            .ok_or_else(|| PackflowError::NotFound(format!("Staging batch {}", name)))?;
        if !batch.staged_requests.contains(&number) {
            batch.staged_requests.push(number);
        }
        info!("Staged request {} into batch {}", number, name);
        Ok(())
    }

    pub async fn unstage_request(
        &self,
        name: &str,
        number: u64,
        requests: &RequestStore,
    ) -> Result<(), PackflowError> {
        {
            let mut batches = self.batches.write().await;
            let batch = batches
                .get_mut(name)
                .ok_or_else(|| PackflowError::NotFound(format!("Staging batch {}", name)))?;
            batch.staged_requests.retain(|n| *n != number);
        }

        requests
            .update(number, |request| {
                request.staging_batch = None;
                Ok(())
            })
            .await?;
        info!("Unstaged request {} from batch {}", number, name);
        Ok(())
    }
}

impl Default for StagingStore {
    fn default() -> Self {
        Self::new()
    }
}
