pub mod plan;
pub mod suite;

pub use plan::{TestClass, TestPlan};
pub use suite::{Abort, SuiteReport, SuiteRunner};
