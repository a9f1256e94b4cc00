// Stand-in for the on-device person-detection model.
//
// Lets the monitor run end to end on a host without the inference runtime
// linked. It scores "people" by the intensity spread of the frame (busy
// scenes have more texture than an empty room) and quantizes the result with
// the configured output parameters, so the dequantization path is the same
// one a real model goes through.

use crowdedness_common::config::ClassifierConfig;
use crowdedness_common::frame::Frame;
use tracing::debug;

use super::quantized::QuantizedOutput;
use super::traits::{ClassifierError, PeopleClassifier};

/// Standard deviation at which the stub reports full confidence.
const FULL_SCALE_SPREAD: f32 = 64.0;

pub struct StubClassifier {
    config: ClassifierConfig,
    expected_len: usize,
}

impl StubClassifier {
    pub fn new(config: ClassifierConfig, expected_len: usize) -> Self {
        Self {
            config,
            expected_len,
        }
    }

    fn quantize(&self, probability: f32) -> i8 {
        let raw = (probability / self.config.scale).round() as i32 + self.config.zero_point;
        raw.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
    }
}

impl PeopleClassifier for StubClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<QuantizedOutput, ClassifierError> {
        if frame.len() != self.expected_len {
            return Err(ClassifierError::InputShape {
                expected: self.expected_len,
                got: frame.len(),
            });
        }

        let samples = frame.samples();
        let n = samples.len() as f32;
        let mean = samples.iter().map(|&s| f32::from(s)).sum::<f32>() / n;
        let variance = samples
            .iter()
            .map(|&s| (f32::from(s) - mean).powi(2))
            .sum::<f32>()
            / n;
        let spread = variance.sqrt();
        let people = (spread / FULL_SCALE_SPREAD).clamp(0.0, 1.0);

        let scores = [self.quantize(1.0 - people), self.quantize(people)];
        debug!(spread, people, ?scores, "STUB inference");
        Ok(QuantizedOutput::new(scores, &self.config))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
