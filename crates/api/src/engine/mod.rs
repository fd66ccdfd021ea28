//! Job execution engine.
//!
//! - [`dispatcher`] accepts submissions, persists `PENDING` records and
//!   hands a trigger to the queue without waiting.
//! - [`trigger`] is the bounded queue between dispatcher and runner.
//! - [`runner`] drains the queue and executes each job in its own task,
//!   bounded by a concurrency limit.
//! - [`coordinator`] owns the per-job state machine: claim, invoke the
//!   worker, record the terminal state.
//! - [`poller`] is the read-only status view.

pub mod coordinator;
pub mod dispatcher;
pub mod poller;
pub mod runner;
pub mod trigger;

pub use coordinator::{Coordinator, CoordinatorError, RetryPolicy, RunOutcome};
pub use dispatcher::{DispatchError, Dispatcher};
pub use poller::{JobView, Poller};
pub use runner::JobRunner;
pub use trigger::{trigger_channel, JobTrigger, TriggerError, TriggerReceiver, TriggerSender};
