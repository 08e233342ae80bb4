//! Application state shared across all request handlers.

use gateway_core::ExecutorRegistry;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (executors are behind Arc).
#[derive(Clone, Debug)]
pub struct AppState {
    /// Executors for every source type this server runs.
    pub registry: ExecutorRegistry,
}

impl AppState {
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self { registry }
    }
}
