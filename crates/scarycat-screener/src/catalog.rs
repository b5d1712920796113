//! Model catalog: concurrent loading and per-model serialized access

use crate::backend::InferenceBackend;
use crate::discovery::model_name;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use scarycat_core::{
    BackendError, Error, EventSink, InferenceOutput, Result, TracingSink,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// One loaded classifier
pub struct ModelEntry<H> {
    name: String,
    source: PathBuf,
    handle: Mutex<H>,
}

impl<H> ModelEntry<H> {
    fn new(name: String, source: PathBuf, handle: H) -> Self {
        Self {
            name,
            source,
            handle: Mutex::new(handle),
        }
    }

    /// Stable name derived from the source file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source the model was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl<H> std::fmt::Debug for ModelEntry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEntry")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Immutable set of loaded models, built once and shared across screenings.
///
/// Entries are kept in name order. Names are unique: when two sources map to
/// the same name, the later source in input order wins.
pub struct ModelCatalog<B: InferenceBackend> {
    backend: Arc<B>,
    entries: Vec<ModelEntry<B::Handle>>,
}

impl<B: InferenceBackend> ModelCatalog<B> {
    /// Start building a catalog for `backend`
    pub fn builder(backend: B) -> CatalogBuilder<B> {
        CatalogBuilder::new(backend)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a successfully built catalog
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry<B::Handle>> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ModelEntry::name).collect()
    }

    /// Entry with exactly this name
    pub fn get(&self, name: &str) -> Option<&ModelEntry<B::Handle>> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// First entry (in name order) whose name contains `fragment`
    pub fn find_by_name_fragment(&self, fragment: &str) -> Option<&ModelEntry<B::Handle>> {
        self.entries.iter().find(|e| e.name.contains(fragment))
    }

    /// Run one entry's model on an image.
    ///
    /// Holds the entry's handle lock for the duration of the call, so a
    /// handle is never used by two callers at once.
    pub fn infer(
        &self,
        entry: &ModelEntry<B::Handle>,
        image: &[u8],
    ) -> std::result::Result<InferenceOutput, BackendError> {
        let mut handle = entry.handle.lock();
        self.backend.infer(&mut handle, image)
    }
}

impl<B: InferenceBackend> std::fmt::Debug for ModelCatalog<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("backend", &self.backend.name())
            .field("entries", &self.entries)
            .finish()
    }
}

/// Builder for [`ModelCatalog`]
pub struct CatalogBuilder<B: InferenceBackend> {
    backend: Arc<B>,
    concurrency: usize,
    events: Arc<dyn EventSink>,
}

impl<B: InferenceBackend> CatalogBuilder<B> {
    /// Create a new builder with one loader per CPU
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            concurrency: num_cpus::get().max(1),
            events: Arc::new(TracingSink),
        }
    }

    /// Maximum number of models loaded at the same time
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Event sink for load progress and failures
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Load every source and build the catalog.
    ///
    /// Each source is loaded on the blocking pool. All loads run to
    /// completion before this returns; if any of them failed, the failure of
    /// the earliest such source is returned and no catalog is built.
    #[tracing::instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn load<I>(self, sources: I) -> Result<ModelCatalog<B>>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let sources: Vec<PathBuf> = sources.into_iter().collect();
        let events = self.events;

        if sources.is_empty() {
            events.error("no model sources were provided");
            return Err(Error::ModelNotFound);
        }

        events.debug(format!(
            "loading {} models with up to {} concurrent loaders",
            sources.len(),
            self.concurrency
        ));
        let started = Instant::now();

        let backend = self.backend;
        let mut outcomes: Vec<(usize, Result<ModelEntry<B::Handle>>)> =
            stream::iter(sources.into_iter().enumerate())
                .map(|(index, source)| {
                    let backend = Arc::clone(&backend);
                    async move {
                        let display = source.display().to_string();
                        let outcome =
                            tokio::task::spawn_blocking(move || load_entry(backend.as_ref(), source))
                                .await
                                .unwrap_or_else(|e| Err(Error::model_load_failed(display, e)));
                        (index, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let mut by_name: BTreeMap<String, ModelEntry<B::Handle>> = BTreeMap::new();
        for (_, outcome) in outcomes {
            let entry = match outcome {
                Ok(entry) => entry,
                Err(e) => {
                    events.error(format!("model loading aborted: {}", e));
                    return Err(e);
                }
            };

            events.debug(format!(
                "loaded model {} from {}",
                entry.name,
                entry.source.display()
            ));
            if let Some(previous) = by_name.insert(entry.name.clone(), entry) {
                events.warning(format!(
                    "duplicate model name {}: replacing {} with a later source",
                    previous.name,
                    previous.source.display()
                ));
            }
        }

        if by_name.is_empty() {
            return Err(Error::ModelNotFound);
        }

        let entries: Vec<_> = by_name.into_values().collect();
        events.info(format!(
            "loaded {} models in {:.1}ms: {}",
            entries.len(),
            started.elapsed().as_secs_f64() * 1000.0,
            entries
                .iter()
                .map(ModelEntry::name)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        Ok(ModelCatalog { backend, entries })
    }
}

fn load_entry<B: InferenceBackend>(backend: &B, source: PathBuf) -> Result<ModelEntry<B::Handle>> {
    let name = model_name(&source).ok_or_else(|| {
        Error::model_load_failed(
            source.display().to_string(),
            BackendError::msg("model source has no usable file name"),
        )
    })?;

    let started = Instant::now();
    let handle = backend
        .load(&source)
        .map_err(|e| Error::model_load_failed(&name, e))?;
    metrics::histogram!("scarycat_model_load_duration_ms")
        .record(started.elapsed().as_secs_f64() * 1000.0);

    Ok(ModelEntry::new(name, source, handle))
}
