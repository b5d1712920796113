//! ScaryCat Core
//!
//! Core types, traits, and utilities shared across ScaryCat components.
//!
//! This crate provides:
//! - Error types and result handling
//! - Value types exchanged between the screener and inference backends
//! - The structured event sink used in place of ambient logging state

pub mod error;
pub mod events;
pub mod types;

pub use error::{BackendError, BoxError, Error, Result};
pub use events::{EventLevel, EventSink, MemorySink, NullSink, ScreeningEvent, TracingSink};
pub use types::{ConfidenceMap, InferenceOutput, Observation};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{BackendError, Error, Result};
    pub use crate::events::{EventLevel, EventSink, ScreeningEvent};
    pub use crate::types::{ConfidenceMap, InferenceOutput, Observation};
}
