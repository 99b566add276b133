pub mod machine;
pub mod store;
pub mod types;

pub use store::RequestStore;
pub use types::{
    ActionKind, ChangeRequest, Priority, RequestAction, RequestState, ReviewAssignment,
    ReviewOutcome, ReviewState, Reviewer,
};
