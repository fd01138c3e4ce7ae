use common::Environment;
use inference::{
    DEFAULT_POSITIVE_THRESHOLD, NormalizerConfig,
    backend::ort::{ExecutionProvider, InputElement, OrtOptions},
};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Environment::try_from(raw).map_err(serde::de::Error::custom)
}

fn deserialize_provider<'de, D>(deserializer: D) -> Result<ExecutionProvider, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    ExecutionProvider::try_from(raw.as_str()).map_err(serde::de::Error::custom)
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    #[serde(deserialize_with = "deserialize_environment")]
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// ONNX model loaded once at startup.
    pub model_path: String,
    pub upload_field: String,
    pub max_upload_bytes: usize,
    /// Exclusive lower bound on P(positive) for a positive verdict.
    pub positive_threshold: f32,
    /// 0 skips the intermediate JPEG re-encode; values above 100 clamp.
    pub jpeg_quality: u16,
    #[serde(deserialize_with = "deserialize_provider")]
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    /// Feed the model `f32` instead of `i32` intensities.
    pub float_input: bool,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig::default().with_jpeg_quality(self.jpeg_quality)
    }

    pub fn ort_options(&self) -> OrtOptions {
        OrtOptions {
            provider: self.execution_provider,
            intra_threads: self.intra_threads,
            input_element: if self.float_input {
                InputElement::Float32
            } else {
                InputElement::Int32
            },
        }
    }
}

/// Unprefixed variables honoured when the `GATEWAY_*` form is absent.
const FALLBACK_VARS: [(&str, &str); 3] = [
    ("PORT", "port"),
    ("HOST", "host"),
    ("MODEL_FP", "model_path"),
];

/// Loads configuration from `GATEWAY_*` environment variables
/// (e.g. `GATEWAY_PORT`, `GATEWAY_MODEL_PATH`), falling back to `PORT`,
/// `HOST` and `MODEL_FP`. A `.env` file in the working directory is read
/// first; process variables take precedence over it.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(config::ConfigError::Message(format!(
                "Failed to read .env file: {}",
                e
            )));
        }
    }

    build_configuration(environment_source(), fallback_values(|var| std::env::var(var).ok()))
}

fn fallback_values(lookup: impl Fn(&str) -> Option<String>) -> config::Map<String, String> {
    FALLBACK_VARS
        .iter()
        .filter_map(|(var, key)| lookup(var).map(|value| (key.to_string(), value)))
        .collect()
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix("GATEWAY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn build_configuration(
    source: config::Environment,
    fallbacks: config::Map<String, String>,
) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "127.0.0.1")?
        .set_default("port", 3000)?
        .set_default("model_path", "./resources/model/model.onnx")?
        .set_default("upload_field", "image")?
        .set_default("max_upload_bytes", 10 * 1024 * 1024)?
        .set_default("positive_threshold", f64::from(DEFAULT_POSITIVE_THRESHOLD))?
        .set_default("jpeg_quality", i64::from(preprocess::DEFAULT_JPEG_QUALITY))?
        .set_default("execution_provider", "cpu")?
        .set_default("intra_threads", 4)?
        .set_default("float_input", false)?;

    for (key, value) in fallbacks {
        builder = builder.set_default(key, value)?;
    }

    let config = builder.add_source(source).build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}
