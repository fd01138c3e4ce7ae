use ndarray::ArrayViewD;
use preprocess::InputTensor;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// A loaded model: one forward pass from a normalized tensor to class scores.
///
/// Implementations are shared between concurrent requests, so they must be
/// callable through `&self`. Runtimes that need exclusive access lock
/// internally.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &InputTensor) -> anyhow::Result<OutputDistribution>;
}

/// Raw model output: its tensor shape and the values flattened row-major.
///
/// For the antigen model this is `[1, 2]` holding `[P(negative), P(positive)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDistribution {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputDistribution {
    pub fn from_array(array: ArrayViewD<'_, f32>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }
}
