pub mod config;
pub mod container;
pub mod error;
pub mod history;
pub mod listener;
pub mod logger;
pub mod probe;
pub mod reactor;
pub mod runner;

// Re-export commonly used types
pub use error::{Result, RexamError};
