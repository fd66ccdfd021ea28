//! [`JobStore`](crate::JobStore) implementations.

pub mod job_repo;
pub mod memory;

pub use job_repo::{JobRepo, PgJobStore};
pub use memory::MemoryJobStore;
