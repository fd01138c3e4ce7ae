use super::{Classifier, OutputDistribution};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use preprocess::InputTensor;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl TryFrom<&str> for ExecutionProvider {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => anyhow::bail!("Unknown execution provider `{}` (expected cpu or cuda)", other),
        }
    }
}

/// Element type of the model's single input.
///
/// The antigen model takes `int32` intensities; `Float32` feeds the same
/// values cast to `f32` for exports that declare a float input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputElement {
    #[default]
    Int32,
    Float32,
}

#[derive(Debug, Clone, Copy)]
pub struct OrtOptions {
    pub provider: ExecutionProvider,
    pub intra_threads: usize,
    pub input_element: InputElement,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            provider: ExecutionProvider::Cpu,
            intra_threads: 4,
            input_element: InputElement::Int32,
        }
    }
}

/// ONNX Runtime classifier. The session is behind a mutex since
/// `Session::run` needs exclusive access.
pub struct OrtClassifier {
    session: Mutex<Session>,
    input_element: InputElement,
}

impl OrtClassifier {
    pub fn load(path: &str, options: OrtOptions) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads)?;

        match options.provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            #[cfg(not(feature = "cuda"))]
            ExecutionProvider::Cuda => {
                anyhow::bail!("CUDA execution provider requested but the `cuda` feature is disabled");
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!(
            model_path = %path,
            input_element = ?options.input_element,
            "Model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_element: options.input_element,
        })
    }
}

impl Classifier for OrtClassifier {
    fn classify(&self, input: &InputTensor) -> anyhow::Result<OutputDistribution> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX Runtime session lock poisoned"))?;

        let view = input.view().into_dyn();

        match self.input_element {
            InputElement::Int32 => {
                let outputs = session.run(ort::inputs![TensorRef::from_array_view(view)?])?;
                let scores = outputs[0].try_extract_array::<f32>()?;
                Ok(OutputDistribution::from_array(scores))
            }
            InputElement::Float32 => {
                let floats = view.mapv(|v| v as f32);
                let outputs = session.run(ort::inputs![TensorRef::from_array_view(floats.view())?])?;
                let scores = outputs[0].try_extract_array::<f32>()?;
                Ok(OutputDistribution::from_array(scores))
            }
        }
    }
}
