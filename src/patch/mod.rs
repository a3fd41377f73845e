//! Patch command pipeline.
//!
//! ```text
//!  caller ──▶ CommandTask ──▶ TaskDispatcher (single-flight, deadline)
//!                 │
//!                 ▼
//!          PatchTransport ◀──▶ patch
//!                 │
//!                 ▼
//!        PatchConfigStore (identity, alert settings)
//! ```
//!
//! Everything here is single-threaded: tasks share collaborators through
//! `Rc` and run on one cooperative executor.

pub mod dispatcher;
pub mod response;
pub mod store;
pub mod task;
pub mod tasks;
pub mod transport;

pub use dispatcher::{InFlight, TaskDispatcher};
pub use store::PatchConfigStore;
pub use task::{CommandTask, TaskContext, TaskFunc};
pub use tasks::PatchTasks;
pub use transport::PatchTransport;
