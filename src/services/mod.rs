pub mod normalizer;
pub mod notifier;
pub mod question_bank;
pub mod scoring;

pub use normalizer::{ContentNormalizer, Normalized, Strategy};
pub use notifier::{
    FanoutNotifier, FileNotifier, Notification, NotificationSink, NotifyLevel, RecordingNotifier,
    TracingNotifier,
};
pub use question_bank::fallback_question;
pub use scoring::{finalize, Submission};
