pub mod backend;
pub mod error;
pub mod evaluator;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use backend::{Classifier, OutputDistribution};
pub use error::{InferenceError, PipelineError};
pub use evaluator::{DEFAULT_POSITIVE_THRESHOLD, DecisionRule, Evaluator, Prediction};
pub use pipeline::Pipeline;
pub use preprocess::{InputTensor, NormalizeError, Normalizer, NormalizerConfig};
