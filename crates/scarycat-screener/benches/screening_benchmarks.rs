//! Screening overhead benchmarks
//!
//! Measures the cost the screener adds on top of model inference:
//! ensemble merging, disambiguation, and batch aggregation. The backend
//! returns canned observations so only orchestration is timed.
//!
//! Run with: cargo bench -p scarycat-screener

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scarycat_core::{BackendError, InferenceOutput, NullSink, Observation};
use scarycat_screener::{model_name, InferenceBackend, ModelCatalog, Screener, ScreenerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Every model reports its own name as a label plus a `rest` label
struct CannedBackend;

impl InferenceBackend for CannedBackend {
    type Handle = Vec<Observation>;

    fn load(&self, source: &Path) -> Result<Self::Handle, BackendError> {
        let name = model_name(source).ok_or_else(|| BackendError::msg("no file name"))?;
        Ok(if name.starts_with("OvO_") {
            vec![Observation::new("safe", 0.8), Observation::new("mouth_open", 0.2)]
        } else {
            vec![Observation::new(name, 0.4), Observation::new("rest", 0.6)]
        })
    }

    fn infer(
        &self,
        handle: &mut Self::Handle,
        _image: &[u8],
    ) -> Result<InferenceOutput, BackendError> {
        Ok(handle.clone().into())
    }
}

fn sources(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/models/behavior_{i:02}.safetensors")))
        .chain(std::iter::once(PathBuf::from(
            "/models/OvO_mouth_open_vs_safe.safetensors",
        )))
        .collect()
}

fn build_screener(rt: &Runtime, models: usize) -> Screener<CannedBackend> {
    rt.block_on(async {
        let catalog = ModelCatalog::builder(CannedBackend)
            .events(Arc::new(NullSink))
            .load(sources(models))
            .await
            .expect("catalog should load");
        Screener::new(catalog, ScreenerConfig::default(), Arc::new(NullSink))
            .expect("default config is valid")
    })
}

/// Per-image scoring cost as the ensemble grows
fn benchmark_score_image(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let image = vec![0u8; 64 * 1024];

    let mut group = c.benchmark_group("Ensemble_Score_Image");
    group.sample_size(100);

    for models in [1, 8, 32] {
        let screener = build_screener(&rt, models);
        group.bench_with_input(BenchmarkId::new("models", models), &image, |b, image| {
            b.iter(|| screener.score_image(black_box(image)).unwrap());
        });
    }

    group.finish();
}

/// Whole-batch screening including aggregation and the blocking hop
fn benchmark_screen_batch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let screener = build_screener(&rt, 8);

    let mut group = c.benchmark_group("Screen_Batch");
    group.sample_size(50);

    for batch_size in [1, 16, 128] {
        let batch: Vec<Bytes> = (0..batch_size)
            .map(|i| Bytes::from(vec![i as u8; 4096]))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("images", batch_size),
            &batch,
            |b, batch| {
                b.to_async(&rt)
                    .iter(|| async { screener.screen(batch.clone(), 0.95).await.unwrap() });
            },
        );
    }

    group.finish();
}

/// Report rendering for a scored batch
fn benchmark_report(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let screener = build_screener(&rt, 8);
    let batch: Vec<Bytes> = (0..64).map(|i| Bytes::from(vec![i as u8; 16])).collect();
    let overall = rt.block_on(screener.screen(batch, 0.3)).unwrap();

    c.bench_function("generate_report_64_images", |b| {
        b.iter(|| black_box(&overall).generate_report());
    });
}

criterion_group!(
    benches,
    benchmark_score_image,
    benchmark_screen_batch,
    benchmark_report
);
criterion_main!(benches);
