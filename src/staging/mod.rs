pub mod aggregate;
pub mod batch;
pub mod store;

pub use aggregate::{BatchAggregator, PendingReview};
pub use batch::{BatchState, StagingBatch};
pub use store::StagingStore;
