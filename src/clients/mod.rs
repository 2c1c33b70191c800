pub mod evaluation;
pub mod generation;

pub use evaluation::{EvaluationSubmission, Evaluator, NoopEvaluator, SubmittedAnswer};
pub use generation::{ExamGenerator, GenerationEnvelope, PayloadFileGenerator, StaticGenerator};
