use crowdedness_common::frame::Frame;

use super::quantized::QuantizedOutput;

/// Person-detection model seam.
///
/// Implementations run inference on one frame and hand back the raw
/// quantized output tensor; dequantization happens in [`QuantizedOutput`].
pub trait PeopleClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<QuantizedOutput, ClassifierError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier expects {expected} input samples, got {got}")]
    InputShape { expected: usize, got: usize },
}
