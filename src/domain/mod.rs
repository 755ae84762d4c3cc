//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Orders and their pending → completed/failed lifecycle
//! - `entitlement` - Enrollments, instructor plans, roles and profiles
//! - `gateway` - Stripe, Payme and Click wire protocols

pub mod billing;
pub mod entitlement;
pub mod foundation;
pub mod gateway;
