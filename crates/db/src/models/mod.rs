//! Row models for the job tables.

pub mod job;
