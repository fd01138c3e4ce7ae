pub mod config;
pub mod error;
pub mod normalizer;
pub mod tensor;

pub use config::{DEFAULT_INPUT_SIZE, DEFAULT_JPEG_QUALITY, NormalizerConfig};
pub use error::NormalizeError;
pub use normalizer::Normalizer;
pub use tensor::InputTensor;
