//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait and error types
//! used across the billing and entitlement domains.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CourseId, OrderId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
