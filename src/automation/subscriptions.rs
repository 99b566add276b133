//! Build-result event subscriptions.
//!
//! Branch and link steps subscribe the automated target to build results
//! so that completion events can be mirrored back to the SCM later. The
//! manager is idempotent: re-subscribing an already subscribed package is
//! a no-op, matching redelivered webhook semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::PackageRef;
use crate::error::PackflowError;

/// Build result channels a target is subscribed to.
pub const SUBSCRIBED_EVENTS: &[&str] = &["build_success", "build_failure"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub package: PackageRef,
    pub event: String,
}

#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    async fn ensure_subscriptions(&self, package: &PackageRef) -> Result<(), PackflowError>;
    async fn remove_subscriptions(&self, package: &PackageRef) -> Result<(), PackflowError>;
    async fn active_for(&self, package: &PackageRef) -> Vec<Subscription>;
}

pub struct InMemorySubscriptions {
    subscriptions: RwLock<HashMap<PackageRef, Vec<Subscription>>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionManager for InMemorySubscriptions {
    async fn ensure_subscriptions(&self, package: &PackageRef) -> Result<(), PackflowError> {
        let mut subscriptions = self.subscriptions.write().await;
        let entry = subscriptions.entry(package.clone()).or_default();
        for event in SUBSCRIBED_EVENTS {
            if !entry.iter().any(|s| s.event == *event) {
                entry.push(Subscription {
                    package: package.clone(),
                    event: event.to_string(),
                });
            }
        }
        debug!("Subscriptions ensured for {}", package);
        Ok(())
    }

    async fn remove_subscriptions(&self, package: &PackageRef) -> Result<(), PackflowError> {
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.remove(package);
        debug!("Subscriptions removed for {}", package);
        Ok(())
    }

    async fn active_for(&self, package: &PackageRef) -> Vec<Subscription> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions.get(package).cloned().unwrap_or_default()
    }
}
