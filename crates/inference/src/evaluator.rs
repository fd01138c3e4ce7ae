use crate::{
    backend::{Classifier, OutputDistribution},
    error::InferenceError,
};
use preprocess::InputTensor;
use serde::Serialize;

/// Minimum positive-class probability for a positive verdict (exclusive).
///
/// Sets the reader's diagnostic sensitivity; the model was validated against
/// this value.
pub const DEFAULT_POSITIVE_THRESHOLD: f32 = 0.95;

/// Position of `P(positive)` in the `[negative, positive]` output.
pub const POSITIVE_CLASS_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionRule {
    pub threshold: f32,
}

impl DecisionRule {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// `data[1] > threshold`. Outputs too short to hold a positive-class
    /// score are rejected instead of read out of bounds.
    pub fn is_positive(&self, data: &[f32]) -> Result<bool, InferenceError> {
        let score = data
            .get(POSITIVE_CLASS_INDEX)
            .ok_or(InferenceError::DegenerateOutput {
                len: data.len(),
                expected: POSITIVE_CLASS_INDEX + 1,
            })?;
        Ok(*score > self.threshold)
    }
}

impl Default for DecisionRule {
    fn default() -> Self {
        Self::new(DEFAULT_POSITIVE_THRESHOLD)
    }
}

/// Verdict for one image, with the raw output it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    shape: Vec<usize>,
    data: Vec<f32>,
    positive: bool,
}

impl Prediction {
    /// Shape of the classifier's output tensor, e.g. `[1, 2]`.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened `[P(negative), P(positive)]`.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn positive(&self) -> bool {
        self.positive
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    rule: DecisionRule,
}

impl Evaluator {
    pub fn new(rule: DecisionRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> DecisionRule {
        self.rule
    }

    /// Runs one forward pass and applies the decision rule.
    ///
    /// Takes the tensor by value; it is dropped as soon as the classifier
    /// returns, whatever the outcome.
    #[tracing::instrument(name = "evaluate", skip(self, input, classifier))]
    pub fn evaluate(
        &self,
        input: InputTensor,
        classifier: &dyn Classifier,
    ) -> Result<Prediction, InferenceError> {
        let output = classifier.classify(&input);
        drop(input);

        let OutputDistribution { shape, data } = output.map_err(InferenceError::Classifier)?;
        let positive = self.rule.is_positive(&data)?;

        tracing::debug!(
            shape = ?shape,
            scores = ?data,
            threshold = self.rule.threshold,
            positive,
            "Applied decision rule"
        );

        Ok(Prediction {
            shape,
            data,
            positive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed distribution and counts invocations
    struct FixedClassifier {
        shape: Vec<usize>,
        data: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(data: &[f32]) -> Self {
            Self {
                shape: vec![1, data.len()],
                data: data.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn classify(&self, _input: &InputTensor) -> anyhow::Result<OutputDistribution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OutputDistribution {
                shape: self.shape.clone(),
                data: self.data.clone(),
            })
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, input: &InputTensor) -> anyhow::Result<OutputDistribution> {
            anyhow::bail!("expected input [1, 128, 128, 1], got {:?}", input.shape())
        }
    }

    fn blank_tensor() -> InputTensor {
        InputTensor::from_frame(&vec![0u8; 256 * 256], 256, 256).unwrap()
    }

    fn verdict(data: &[f32]) -> bool {
        Evaluator::default()
            .evaluate(blank_tensor(), &FixedClassifier::new(data))
            .unwrap()
            .positive()
    }

    #[test]
    fn test_threshold_boundaries() {
        assert!(verdict(&[0.04, 0.96]), "0.96 is above the threshold");
        assert!(!verdict(&[0.06, 0.94]), "0.94 is below the threshold");
        assert!(
            !verdict(&[0.05, 0.95]),
            "Exactly 0.95 must be negative (strict comparison)"
        );
    }

    #[test]
    fn test_only_positive_class_score_is_read() {
        // A large negative score never flips the verdict on its own
        assert!(!verdict(&[0.99, 0.01]));
        assert!(verdict(&[0.99, 0.999]));
    }

    #[test]
    fn test_prediction_carries_raw_output() {
        let classifier = FixedClassifier::new(&[0.3, 0.7]);

        let prediction = Evaluator::default()
            .evaluate(blank_tensor(), &classifier)
            .unwrap();

        assert_eq!(prediction.shape(), &[1, 2]);
        assert_eq!(prediction.data(), &[0.3, 0.7]);
        assert!(!prediction.positive());
        assert_eq!(
            classifier.calls.load(Ordering::SeqCst),
            1,
            "Exactly one forward pass per evaluation"
        );
    }

    #[test]
    fn test_single_value_output_is_rejected() {
        let result = Evaluator::default().evaluate(blank_tensor(), &FixedClassifier::new(&[0.99]));

        assert!(
            matches!(
                result,
                Err(InferenceError::DegenerateOutput {
                    len: 1,
                    expected: 2
                })
            ),
            "Expected DegenerateOutput, got {:?}",
            result
        );
    }

    #[test]
    fn test_empty_output_is_rejected() {
        let result = Evaluator::default().evaluate(blank_tensor(), &FixedClassifier::new(&[]));
        assert!(matches!(result, Err(InferenceError::DegenerateOutput { len: 0, .. })));
    }

    #[test]
    fn test_classifier_failure_is_inference_error() {
        let result = Evaluator::default().evaluate(blank_tensor(), &FailingClassifier);

        match result {
            Err(InferenceError::Classifier(e)) => {
                assert!(e.to_string().contains("expected input"));
            }
            other => panic!("Expected Classifier error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_threshold() {
        let evaluator = Evaluator::new(DecisionRule::new(0.5));
        let prediction = evaluator
            .evaluate(blank_tensor(), &FixedClassifier::new(&[0.4, 0.6]))
            .unwrap();
        assert!(prediction.positive());
    }

    #[test]
    fn test_default_threshold_is_095() {
        assert_eq!(DecisionRule::default().threshold, 0.95);
        assert_eq!(Evaluator::default().rule(), DecisionRule::new(0.95));
    }

    #[test]
    fn test_prediction_serializes_with_wire_field_names() {
        let prediction = Evaluator::default()
            .evaluate(blank_tensor(), &FixedClassifier::new(&[0.5, 0.5]))
            .unwrap();

        let json = serde_json::to_value(&prediction).unwrap();

        assert_eq!(json["shape"], serde_json::json!([1, 2]));
        assert_eq!(json["data"], serde_json::json!([0.5, 0.5]));
        assert_eq!(json["positive"], serde_json::json!(false));
    }
}
