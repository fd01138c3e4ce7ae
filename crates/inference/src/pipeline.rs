use crate::{
    backend::Classifier,
    error::PipelineError,
    evaluator::{Evaluator, Prediction},
};
use common::span;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use preprocess::Normalizer;
use std::sync::Arc;
use std::time::Instant;

struct PipelineMetrics {
    duration: Histogram<f64>,
    evaluations: Counter<u64>,
    positives: Counter<u64>,
}

impl PipelineMetrics {
    fn init(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        let duration = meter
            .f64_histogram("evaluation_duration_seconds")
            .with_description("Time to evaluate one upload (normalize + infer + decide)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let evaluations = meter
            .u64_counter("evaluations_total")
            .with_description("Uploads evaluated, by outcome")
            .build();
        let positives = meter
            .u64_counter("verdicts_positive_total")
            .with_description("Evaluations that produced a positive verdict")
            .build();

        Self {
            duration,
            evaluations,
            positives,
        }
    }
}

/// Normalizer, evaluator and the loaded classifier bundled for the request
/// path. Shared read-only between requests.
pub struct Pipeline {
    normalizer: Normalizer,
    evaluator: Evaluator,
    classifier: Arc<dyn Classifier>,
    metrics: PipelineMetrics,
}

impl Pipeline {
    pub fn new(normalizer: Normalizer, evaluator: Evaluator, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            normalizer,
            evaluator,
            classifier,
            metrics: PipelineMetrics::init("inference"),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Normalizes `raw` and evaluates it. Runs to completion or fails; no
    /// partial result is ever returned.
    pub fn run(&self, raw: &[u8]) -> Result<Prediction, PipelineError> {
        let _s = span!("pipeline_run");
        let start = Instant::now();

        let result = self
            .normalizer
            .normalize(raw)
            .map_err(PipelineError::from)
            .and_then(|tensor| {
                self.evaluator
                    .evaluate(tensor, self.classifier.as_ref())
                    .map_err(PipelineError::from)
            });

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.duration.record(elapsed, &[]);

        match &result {
            Ok(prediction) => {
                self.metrics
                    .evaluations
                    .add(1, &[KeyValue::new("outcome", "success")]);
                if prediction.positive() {
                    self.metrics.positives.add(1, &[]);
                }
                tracing::debug!(
                    upload_bytes = raw.len(),
                    positive = prediction.positive(),
                    elapsed_ms = elapsed * 1000.0,
                    "Evaluation complete"
                );
            }
            Err(e) => {
                self.metrics
                    .evaluations
                    .add(1, &[KeyValue::new("outcome", e.kind())]);
            }
        }

        result
    }
}
