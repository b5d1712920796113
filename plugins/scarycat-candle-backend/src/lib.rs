//! Candle inference backend for ScaryCat
//!
//! Runs Vision Transformer image classifiers stored as `.safetensors`
//! weight files. Each weight file is paired with a JSON manifest of the
//! same stem:
//!
//! ```text
//! models/
//!   ears_back.safetensors
//!   ears_back.json        {"labels": ["ears_back", "rest"]}
//! ```
//!
//! The manifest lists class labels in logit order and may override the
//! input size, normalization, and ViT hyperparameters.
//!
//! Build with `--features metal` or `--features cuda` for GPU inference.

pub mod manifest;
pub mod preprocess;
pub mod vit_backend;

pub use manifest::ModelManifest;
pub use vit_backend::{CandleVitBackend, VitClassifier};
