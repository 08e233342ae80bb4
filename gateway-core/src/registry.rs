//! Executor registry keyed by source type.
//!
//! The gateway resolves the executor for every call at call time, so one
//! process can host any number of source types behind one endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::adapter::StreamAdapter;
use crate::errors::ExecutorError;
use crate::executors::{AmqpExecutor, CalendarExecutor, EventSourceExecutor};

/// Registered executors, keyed by [`EventSourceExecutor::kind`].
///
/// Cheap to clone; executors are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: BTreeMap<&'static str, Arc<dyn EventSourceExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in executor, sharing one adapter
    /// configuration.
    pub fn with_builtin(adapter: StreamAdapter) -> Self {
        let mut registry = Self::new();
        registry.register(CalendarExecutor::new(adapter));
        registry.register(AmqpExecutor::new(adapter));
        registry
    }

    /// Register an executor, replacing any previous one of the same kind.
    pub fn register<E>(&mut self, executor: E)
    where
        E: EventSourceExecutor + 'static,
    {
        let kind = executor.kind();
        if self.executors.insert(kind, Arc::new(executor)).is_some() {
            info!(kind, "Replaced registered executor");
        }
    }

    /// Keep only the executors whose kind is listed.
    pub fn retain(&mut self, kinds: &[String]) {
        self.executors
            .retain(|kind, _| kinds.iter().any(|k| k == kind));
    }

    /// Resolve the executor for a source type.
    pub fn get(&self, kind: &str) -> Result<Arc<dyn EventSourceExecutor>, ExecutorError> {
        self.executors
            .get(kind)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.executors.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.executors.keys().copied().collect()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::executors::{amqp, calendar};
    use gateway_sdk::objects::EventSource;

    #[test]
    fn test_builtin_kinds() {
        let registry = ExecutorRegistry::with_builtin(StreamAdapter::default());
        assert_eq!(registry.kinds(), vec![amqp::KIND, calendar::KIND]);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ExecutorRegistry::with_builtin(StreamAdapter::default());
        assert!(matches!(
            registry.get("kafka"),
            Err(ExecutorError::UnknownKind(kind)) if kind == "kafka"
        ));
    }

    #[test]
    fn test_retain_filters_kinds() {
        let mut registry = ExecutorRegistry::with_builtin(StreamAdapter::default());
        registry.retain(&["calendar".to_string()]);
        assert!(registry.contains("calendar"));
        assert!(!registry.contains("amqp"));
    }

    #[tokio::test]
    async fn test_dispatch_resolves_at_call_time() {
        let registry = ExecutorRegistry::with_builtin(StreamAdapter::default());
        let source = EventSource::new("daily", r#"{"interval": "1h"}"#);

        let executor = registry.get("calendar").unwrap();
        assert!(executor.validate_event_source(&source).await.is_valid());

        // The same payload means nothing to the broker executor.
        let executor = registry.get("amqp").unwrap();
        assert!(!executor.validate_event_source(&source).await.is_valid());
    }
}
