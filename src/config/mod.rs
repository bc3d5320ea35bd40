pub mod loader;
pub mod manager;
pub mod runtime;
pub mod types;

pub use loader::ConfigLoader;
pub use manager::ConfigurationManager;
pub use runtime::RuntimeConfig;
pub use types::{ContainerSection, ReactorSection, RexamConfig};
