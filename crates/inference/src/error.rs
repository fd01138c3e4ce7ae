use preprocess::NormalizeError;
use thiserror::Error;

/// Failures of the forward pass or of the output it produced.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Classifier invocation failed: {0:#}")]
    Classifier(anyhow::Error),

    #[error("Classifier returned {len} values, expected at least {expected}")]
    DegenerateOutput { len: usize, expected: usize },
}

/// Any failure of a single normalize-then-evaluate run.
///
/// Callers log the variant and report one opaque failure to clients.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Short label for logs and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Normalize(e) => e.kind(),
            PipelineError::Inference(InferenceError::Classifier(_)) => "inference",
            PipelineError::Inference(InferenceError::DegenerateOutput { .. }) => "degenerate_output",
        }
    }
}
