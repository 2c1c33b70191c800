pub mod exam;
pub mod question;
pub mod result;
pub mod subject;

pub use exam::{Difficulty, Exam, ExamRequest, GenerationRequest};
pub use question::{Question, QuestionDefect, QuestionType};
pub use result::{ExamResult, FeedbackTier, QuestionOutcome, NO_ANSWER};
pub use subject::SubjectBucket;
