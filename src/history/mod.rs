pub mod model;
pub mod printer;
pub mod recorder;
pub mod serialization;
pub mod storage;

pub use model::{FailureRecord, RunRecord};
pub use recorder::{build_record, record_run};
pub use storage::HistoryStorage;
