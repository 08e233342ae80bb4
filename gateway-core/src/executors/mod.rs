//! Variant executors.
//!
//! Every source type implements the same capability set,
//! [`EventSourceExecutor`]:
//!
//! - `validate_event_source`: run the validation pipeline; no listener is
//!   involved.
//! - `start_event_source`: spawn one listener behind the fault boundary
//!   and stream its data units until the call ends.
//!
//! Built-in variants:
//!
//! - [`CalendarExecutor`]: cron schedules and fixed intervals
//! - [`AmqpExecutor`]: messages consumed from an AMQP exchange

pub mod amqp;
pub mod calendar;

pub use amqp::{AmqpConfig, AmqpExecutor};
pub use calendar::{CalendarConfig, CalendarExecutor};

use async_trait::async_trait;
use gateway_sdk::objects::EventSource;

use crate::adapter::EventSink;
use crate::errors::ExecutorError;
use crate::validation::Validation;

/// The capability set every source type must provide.
#[async_trait]
pub trait EventSourceExecutor: Send + Sync {
    /// Registry key of the source type, e.g. `calendar`.
    fn kind(&self) -> &'static str;

    /// Validate an event source without starting it.
    async fn validate_event_source(&self, source: &EventSource) -> Validation;

    /// Run an event source, forwarding every data unit to `sink`.
    ///
    /// Blocks for the whole call: returns `Ok` when the outbound stream
    /// ends or the listener finishes, and the terminal error otherwise.
    async fn start_event_source(
        &self,
        source: &EventSource,
        sink: &mut dyn EventSink,
    ) -> Result<(), ExecutorError>;
}
