//! Submission and finality tracking.

pub mod state;
pub mod tracker;

pub use state::{FinalityState, FinalityStateMachine};
pub use tracker::{is_tentative_success, ConfirmedTransaction, FinalityTracker};
