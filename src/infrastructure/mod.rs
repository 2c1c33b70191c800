pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{append_exam, record_result, ExamStore, JsonFileStore, MemoryStore};

#[cfg(test)]
pub(crate) use store::FailingStore;
