//! Inference backend trait
//!
//! The screener never looks inside a model. A backend turns a model source
//! into a handle and a handle plus an image buffer into observations.

use scarycat_core::{BackendError, InferenceOutput};
use std::path::Path;

/// Pluggable inference engine.
///
/// Implement this trait in external crates to run the ensemble on a concrete
/// runtime (Candle, ONNX, a remote service) without coupling the screener to
/// heavyweight dependencies. Handles are reused sequentially but are never
/// invoked concurrently: `infer` receives exclusive access to the handle.
pub trait InferenceBackend: Send + Sync + 'static {
    /// Loaded model artifact
    type Handle: Send + 'static;

    /// Load one model artifact from its source locator
    fn load(&self, source: &Path) -> Result<Self::Handle, BackendError>;

    /// Run the model on a raw image buffer
    fn infer(&self, handle: &mut Self::Handle, image: &[u8]) -> Result<InferenceOutput, BackendError>;

    /// Backend name, for diagnostics
    fn name(&self) -> &str {
        "inference-backend"
    }
}
