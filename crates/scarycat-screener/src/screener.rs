//! Screener facade: catalog + scorer + batch aggregation

use crate::backend::InferenceBackend;
use crate::catalog::ModelCatalog;
use crate::config::{validate_threshold, OnImageError, ScreenerConfig};
use crate::discovery::{FsDiscovery, ModelDiscovery};
use crate::result::{IndividualScreeningResult, OverallScreeningResult, ScreeningFailure};
use crate::scorer::EnsembleScorer;
use bytes::Bytes;
use scarycat_core::{ConfidenceMap, Error, EventSink, Result};
use std::sync::Arc;
use std::time::Instant;

/// Screens batches of images against a loaded model catalog.
///
/// The catalog is loaded once and shared; every `screen` call gets fresh
/// results and carries its own threshold.
pub struct Screener<B: InferenceBackend> {
    catalog: Arc<ModelCatalog<B>>,
    scorer: Arc<EnsembleScorer>,
    config: ScreenerConfig,
    events: Arc<dyn EventSink>,
}

impl<B: InferenceBackend> Screener<B> {
    /// Create a screener over an already loaded catalog
    pub fn new(
        catalog: ModelCatalog<B>,
        config: ScreenerConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = config.build_scorer(Arc::clone(&events));

        Ok(Self {
            catalog: Arc::new(catalog),
            scorer: Arc::new(scorer),
            config,
            events,
        })
    }

    /// Discover models under `config.models_dir` and load them
    pub async fn from_config(
        backend: B,
        config: ScreenerConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let discovery = FsDiscovery::new(&config.model_extension);
        Self::from_discovery(backend, &discovery, config, events).await
    }

    /// Load the models found by a custom discovery
    pub async fn from_discovery<D: ModelDiscovery>(
        backend: B,
        discovery: &D,
        config: ScreenerConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        events.debug(format!("searching {} for models", config.models_dir.display()));
        let sources = discovery.discover(&config.models_dir).map_err(|e| {
            events.error(format!("model discovery failed: {}", e));
            e
        })?;
        if sources.is_empty() {
            events.error(format!(
                "no model sources found in {}",
                config.models_dir.display()
            ));
            return Err(Error::ModelNotFound);
        }

        let catalog = ModelCatalog::builder(backend)
            .concurrency(config.load_concurrency)
            .events(Arc::clone(&events))
            .load(sources)
            .await?;

        Self::new(catalog, config, events)
    }

    pub fn catalog(&self) -> &ModelCatalog<B> {
        &self.catalog
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Ensemble confidences for one image, including disambiguation
    pub fn score_image(&self, image: &[u8]) -> Result<ConfidenceMap> {
        self.scorer.score_image(self.catalog.as_ref(), image)
    }

    /// Screen with the configured default threshold
    pub async fn screen_default(&self, images: Vec<Bytes>) -> Result<OverallScreeningResult> {
        self.screen(images, self.config.probability_threshold).await
    }

    /// Screen a batch of images.
    ///
    /// Images are scored one at a time in input order on the blocking pool.
    /// The result lists images in input order. With the default `abort`
    /// policy the first image that fails to score fails the whole call.
    #[tracing::instrument(skip_all, fields(images = images.len(), threshold = threshold))]
    pub async fn screen(
        &self,
        images: Vec<Bytes>,
        threshold: f32,
    ) -> Result<OverallScreeningResult> {
        let threshold = validate_threshold(threshold)?;

        let batch = Batch {
            catalog: Arc::clone(&self.catalog),
            scorer: Arc::clone(&self.scorer),
            events: Arc::clone(&self.events),
            policy: self.config.on_image_error,
            threshold,
        };

        tokio::task::spawn_blocking(move || batch.run(images))
            .await
            .map_err(|e| Error::internal(format!("screening task failed: {}", e)))?
    }

    /// Synchronous variant of [`Screener::screen`] for callers outside a runtime
    pub fn screen_blocking(
        &self,
        images: Vec<Bytes>,
        threshold: f32,
    ) -> Result<OverallScreeningResult> {
        let threshold = validate_threshold(threshold)?;
        Batch {
            catalog: Arc::clone(&self.catalog),
            scorer: Arc::clone(&self.scorer),
            events: Arc::clone(&self.events),
            policy: self.config.on_image_error,
            threshold,
        }
        .run(images)
    }
}

struct Batch<B: InferenceBackend> {
    catalog: Arc<ModelCatalog<B>>,
    scorer: Arc<EnsembleScorer>,
    events: Arc<dyn EventSink>,
    policy: OnImageError,
    threshold: f32,
}

impl<B: InferenceBackend> Batch<B> {
    fn run(self, images: Vec<Bytes>) -> Result<OverallScreeningResult> {
        let started = Instant::now();
        let total = images.len();
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, image) in images.into_iter().enumerate() {
            match self.scorer.score_image(self.catalog.as_ref(), &image) {
                Ok(confidences) => {
                    let result =
                        IndividualScreeningResult::new(image, confidences, self.threshold, index);
                    metrics::counter!("scarycat_images_screened_total").increment(1);
                    if result.is_flagged() {
                        metrics::counter!("scarycat_images_flagged_total").increment(1);
                    }
                    results.push(result);
                }
                Err(e) => match self.policy {
                    OnImageError::Abort => {
                        self.events
                            .error(format!("image #{} failed to score: {}", index, e));
                        return Err(e);
                    }
                    OnImageError::Continue => {
                        self.events.warning(format!(
                            "image #{} failed to score, continuing: {}",
                            index, e
                        ));
                        failures.push(ScreeningFailure::new(index, &e));
                    }
                },
            }
        }

        let overall = OverallScreeningResult::new(results, failures);
        self.events.info(format!(
            "screened {} images in {:.1}ms: {} flagged, {} failed",
            total,
            started.elapsed().as_secs_f64() * 1000.0,
            overall.flagged_count(),
            overall.failures().len()
        ));
        self.events.debug(overall.generate_report());

        Ok(overall)
    }
}
