//! Course Payments - payment reconciliation for the course marketplace
//!
//! Records checkout orders, confirms them through Stripe, Payme and Click,
//! and grants course enrollments or instructor plans exactly once per
//! completed order.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
