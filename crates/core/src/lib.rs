//! Domain types shared by the store, the agents and the HTTP service.
//!
//! This crate has no internal dependencies: job status and its state
//! machine, the error taxonomy, and the [`worker::Worker`] boundary all live
//! here so that every other crate agrees on them.

pub mod error;
pub mod job;
pub mod types;
pub mod worker;
