use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use inference::{
    Classifier, DecisionRule, Evaluator, InferenceError, InputTensor, NormalizeError, Normalizer,
    OutputDistribution, Pipeline, PipelineError,
};
use std::io::Cursor;
use std::sync::Arc;

/// Stands in for the trained model: answers with a recorded distribution
/// chosen by the mean intensity of the tensor it receives.
struct RecordedClassifier {
    bright: [f32; 2],
    dark: [f32; 2],
}

impl Classifier for RecordedClassifier {
    fn classify(&self, input: &InputTensor) -> anyhow::Result<OutputDistribution> {
        anyhow::ensure!(
            input.shape() == [1, 256, 256, 1],
            "expected input [1, 256, 256, 1], got {:?}",
            input.shape()
        );
        let count = input.shape().iter().product::<usize>() as f64;
        let mean = input.values().map(f64::from).sum::<f64>() / count;
        let data = if mean > 127.0 { self.bright } else { self.dark };
        Ok(OutputDistribution {
            shape: vec![1, 2],
            data: data.to_vec(),
        })
    }
}

struct ShortOutputClassifier;

impl Classifier for ShortOutputClassifier {
    fn classify(&self, _input: &InputTensor) -> anyhow::Result<OutputDistribution> {
        Ok(OutputDistribution {
            shape: vec![1],
            data: vec![0.99],
        })
    }
}

/// Synthetic test strip: a bright card with a darker control line,
/// photographed at a phone-camera aspect ratio
fn fixture_upload(card: u8, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(300, 400, |_, y| {
        if (180..200).contains(&y) {
            Rgb([card / 3, card / 4, card / 4])
        } else {
            Rgb([card, card, card.saturating_sub(10)])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

fn pipeline_with(classifier: Arc<dyn Classifier>) -> Pipeline {
    Pipeline::new(Normalizer::default(), Evaluator::default(), classifier)
}

fn recorded() -> Arc<dyn Classifier> {
    Arc::new(RecordedClassifier {
        bright: [0.021_3, 0.978_7],
        dark: [0.884_1, 0.115_9],
    })
}

#[test]
fn test_bright_fixture_reproduces_recorded_positive_distribution() {
    let pipeline = pipeline_with(recorded());

    let prediction = pipeline.run(&fixture_upload(230, ImageFormat::Jpeg)).unwrap();

    assert_eq!(prediction.shape(), &[1, 2]);
    assert!((prediction.data()[0] - 0.021_3).abs() < 1e-6);
    assert!((prediction.data()[1] - 0.978_7).abs() < 1e-6);
    assert!(prediction.positive(), "0.9787 exceeds the 0.95 threshold");
}

#[test]
fn test_dark_fixture_reproduces_recorded_negative_distribution() {
    let pipeline = pipeline_with(recorded());

    let prediction = pipeline.run(&fixture_upload(40, ImageFormat::Png)).unwrap();

    assert_eq!(prediction.data(), &[0.884_1, 0.115_9]);
    assert!(!prediction.positive());
}

#[test]
fn test_threshold_is_configurable_end_to_end() {
    let pipeline = Pipeline::new(
        Normalizer::default(),
        Evaluator::new(DecisionRule::new(0.1)),
        recorded(),
    );

    let prediction = pipeline.run(&fixture_upload(40, ImageFormat::Png)).unwrap();

    assert!(prediction.positive(), "0.1159 exceeds a 0.1 threshold");
}

#[test]
fn test_malformed_upload_fails_before_inference() {
    let pipeline = pipeline_with(recorded());

    let result = pipeline.run(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02]);

    assert!(matches!(
        result,
        Err(PipelineError::Normalize(NormalizeError::Decode(_)))
    ));
}

#[test]
fn test_short_classifier_output_fails_evaluation() {
    let pipeline = pipeline_with(Arc::new(ShortOutputClassifier));

    let result = pipeline.run(&fixture_upload(230, ImageFormat::Png));

    match result {
        Err(PipelineError::Inference(InferenceError::DegenerateOutput { len, .. })) => {
            assert_eq!(len, 1)
        }
        other => panic!("Expected DegenerateOutput, got {:?}", other),
    }
}

#[test]
fn test_pipeline_is_shareable_across_threads() {
    let pipeline = Arc::new(pipeline_with(recorded()));
    let upload = Arc::new(fixture_upload(230, ImageFormat::Jpeg));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let upload = Arc::clone(&upload);
            std::thread::spawn(move || pipeline.run(&upload).map(|p| p.positive()))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().unwrap());
    }
}
