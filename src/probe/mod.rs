pub mod invoker;
pub mod manifest;
pub mod types;

pub use invoker::{
    InvokerKind, NativeInvokerFactory, ProbeInvoker, ProbeInvokerFactory, ProcessInvokerFactory,
};
pub use manifest::{SuiteManifest, TestEntry};
pub use types::{Probe, ProbeBuilder, TestAddress, TestDescription};
