#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod boundary;
pub mod errors;
pub mod executors;
pub mod registry;
pub mod signals;
pub mod validation;

pub use adapter::{AdapterConfig, EventSink, SinkError, StreamAdapter};
pub use errors::ExecutorError;
pub use executors::EventSourceExecutor;
pub use registry::ExecutorRegistry;
pub use validation::Validation;
