pub mod quantized;
pub mod stub;
pub mod traits;

pub use quantized::{Label, QuantizedOutput, LABELS};
pub use stub::StubClassifier;
pub use traits::{ClassifierError, PeopleClassifier};
