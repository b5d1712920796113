//! Scripted inference backend for testing
//!
//! Provides a configurable fake of the InferenceBackend trait that returns
//! scripted observations per model, so screening behavior can be tested
//! without real model weights.

#![allow(dead_code)]

use bytes::Bytes;
use parking_lot::Mutex;
use scarycat_core::{BackendError, InferenceOutput, MemorySink, Observation};
use scarycat_screener::{model_name, InferenceBackend, ModelCatalog};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a scripted model returns
#[derive(Clone)]
pub enum Script {
    /// Same observations for every image
    Fixed(Vec<Observation>),
    /// Observations keyed by image bytes; unknown images get no observations
    ByImage(HashMap<Vec<u8>, Vec<Observation>>),
    /// Non-classification output
    Unrecognized,
    /// Inference error
    Fail(String),
}

/// Handle for a scripted model
pub struct ScriptedHandle {
    name: String,
}

/// A backend whose models return scripted observations
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    failing_loads: HashSet<String>,
    load_count: AtomicUsize,
    calls: Mutex<Vec<String>>,
    infer_delay: Option<Duration>,
    in_flight: Mutex<HashMap<String, Arc<AtomicUsize>>>,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a model by name
    pub fn with_model(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    /// Model returning the same (label, confidence) pairs for every image
    pub fn with_fixed(self, name: &str, pairs: &[(&str, f32)]) -> Self {
        self.with_model(name, Script::Fixed(observations(pairs)))
    }

    /// Make loading this model fail
    pub fn with_failing_load(mut self, name: &str) -> Self {
        self.failing_loads.insert(name.to_string());
        self
    }

    /// Hold every inference call open for `delay`
    pub fn with_infer_delay(mut self, delay: Duration) -> Self {
        self.infer_delay = Some(delay);
        self
    }

    /// Most calls ever running at once on a single model
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn gauge(&self, name: &str) -> Arc<AtomicUsize> {
        Arc::clone(self.in_flight.lock().entry(name.to_string()).or_default())
    }

    fn scripted_output(&self, name: &str, image: &[u8]) -> Result<InferenceOutput, BackendError> {
        match self.scripts.get(name) {
            Some(Script::Fixed(observations)) => Ok(observations.clone().into()),
            Some(Script::ByImage(by_image)) => Ok(by_image
                .get(image)
                .cloned()
                .unwrap_or_default()
                .into()),
            Some(Script::Unrecognized) => Ok(InferenceOutput::unrecognized("feature embedding")),
            Some(Script::Fail(message)) => Err(BackendError::msg(message.clone())),
            None => Ok(InferenceOutput::Classifications(Vec::new())),
        }
    }

    /// Number of load attempts so far
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Model names in invocation order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of invocations of one model
    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == name).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

impl InferenceBackend for ScriptedBackend {
    type Handle = ScriptedHandle;

    fn load(&self, source: &Path) -> Result<ScriptedHandle, BackendError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let name = model_name(source).ok_or_else(|| BackendError::msg("no file name"))?;

        if self.failing_loads.contains(&name) {
            return Err(BackendError::msg(format!("{} has corrupt weights", name)));
        }
        Ok(ScriptedHandle { name })
    }

    fn infer(
        &self,
        handle: &mut ScriptedHandle,
        image: &[u8],
    ) -> Result<InferenceOutput, BackendError> {
        let gauge = self.gauge(&handle.name);
        let running = gauge.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.calls.lock().push(handle.name.clone());
        if let Some(delay) = self.infer_delay {
            std::thread::sleep(delay);
        }
        let output = self.scripted_output(&handle.name, image);

        gauge.fetch_sub(1, Ordering::SeqCst);
        output
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn observations(pairs: &[(&str, f32)]) -> Vec<Observation> {
    pairs
        .iter()
        .map(|(label, confidence)| Observation::new(*label, *confidence))
        .collect()
}

pub fn sources(names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| PathBuf::from(format!("/models/{name}.safetensors")))
        .collect()
}

/// Load a catalog with one source per name
pub async fn catalog(backend: ScriptedBackend, names: &[&str]) -> ModelCatalog<ScriptedBackend> {
    ModelCatalog::builder(backend)
        .concurrency(2)
        .events(Arc::new(MemorySink::new()))
        .load(sources(names))
        .await
        .expect("catalog should load")
}

pub fn images(contents: &[&'static str]) -> Vec<Bytes> {
    contents
        .iter()
        .map(|c| Bytes::from_static(c.as_bytes()))
        .collect()
}
