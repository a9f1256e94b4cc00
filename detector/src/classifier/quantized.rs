use crowdedness_common::config::ClassifierConfig;

/// Output labels of the two-class person-detection model, in tensor order.
pub const LABELS: [&str; 2] = ["nothing", "people"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Nothing,
    People,
}

impl Label {
    pub fn index(self) -> usize {
        match self {
            Self::Nothing => 0,
            Self::People => 1,
        }
    }

    pub fn name(self) -> &'static str {
        LABELS[self.index()]
    }
}

/// Raw int8 scores plus the output tensor's quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedOutput {
    pub scores: [i8; 2],
    pub zero_point: i32,
    pub scale: f32,
}

impl QuantizedOutput {
    pub fn new(scores: [i8; 2], config: &ClassifierConfig) -> Self {
        Self {
            scores,
            zero_point: config.zero_point,
            scale: config.scale,
        }
    }

    /// `(raw - zero_point) * scale`
    pub fn dequantize(&self, label: Label) -> f32 {
        (i32::from(self.scores[label.index()]) - self.zero_point) as f32 * self.scale
    }

    pub fn people_probability(&self) -> f32 {
        self.dequantize(Label::People)
    }

    pub fn nothing_probability(&self) -> f32 {
        self.dequantize(Label::Nothing)
    }
}
