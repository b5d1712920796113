//! ScaryCat Screener
//!
//! Screens images for "scary cat" content with an ensemble of one-vs-rest
//! classifiers:
//! - Models are loaded once, concurrently, into an immutable [`ModelCatalog`]
//! - Each image runs through every model in turn and the findings are merged
//!   into one confidence map, minus the housekeeping labels `rest` and `safe`
//! - A lone `mouth_open` finding is re-checked by a dedicated one-vs-one model
//! - Batch results keep input order and render to a text report or JSON
//!
//! The inference engine is pluggable through [`InferenceBackend`].

pub mod backend;
pub mod catalog;
pub mod config;
pub mod disambiguator;
pub mod discovery;
pub mod report;
pub mod result;
pub mod scorer;
pub mod screener;

pub use backend::InferenceBackend;
pub use catalog::{CatalogBuilder, ModelCatalog, ModelEntry};
pub use config::{
    validate_threshold, DisambiguationConfig, OnImageError, ScreenerConfig,
    DEFAULT_PROBABILITY_THRESHOLD,
};
pub use disambiguator::{Disambiguator, Resolution};
pub use discovery::{model_name, FsDiscovery, ModelDiscovery};
pub use result::{
    IndividualScreeningResult, OverallScreeningResult, ScreeningFailure, ScreeningSummary,
};
pub use scorer::{EnsembleScorer, DEFAULT_EXCLUDED_LABELS};
pub use screener::Screener;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::InferenceBackend;
    pub use crate::catalog::ModelCatalog;
    pub use crate::config::ScreenerConfig;
    pub use crate::result::{IndividualScreeningResult, OverallScreeningResult};
    pub use crate::screener::Screener;
    pub use scarycat_core::prelude::*;
}
