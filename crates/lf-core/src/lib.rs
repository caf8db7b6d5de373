//! lf-core: shared types, errors, configuration, and the event bus.
//!
//! This crate is the foundational dependency for all other lf-* crates. It
//! holds the job model and its state machine, the resolution ladder types and
//! the pure ladder planner, the unified error type, application
//! configuration, and a broadcast event bus for job lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;
pub mod ladder;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::JobId;
pub use job::{Job, JobStatus};
pub use ladder::{plan, Catalog, Rung, SourceDimensions};
pub use config::Config;
pub use events::{Event, EventBus, EventPayload};
