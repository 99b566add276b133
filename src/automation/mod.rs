pub mod engine;
pub mod run;
pub mod steps;
pub mod subscriptions;
pub mod target;

pub use engine::AutomationEngine;
pub use run::{AutomationRun, RunLedger, RunStatus, StepOutcome, StepStatus};
pub use steps::{StepContext, StepError, StepReport};
pub use subscriptions::{InMemorySubscriptions, Subscription, SubscriptionManager};
