//! Fault boundary around listener tasks.
//!
//! Each listener runs in its own tokio task. A panic inside it unwinds
//! only that task: the boundary turns it into a
//! [`ListenerOutcome::Faulted`] for the owning adapter and logs it with
//! the event source name. Sibling listeners and the process are
//! untouched.

use std::any::Any;
use std::future::Future;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

/// How a listener task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    CompletedNormally,
    Faulted(String),
}

/// A listener task running behind the fault boundary.
pub struct GuardedListener {
    name: String,
    handle: JoinHandle<()>,
    finished: Option<ListenerOutcome>,
}

impl GuardedListener {
    /// Spawn `listener` as its own task.
    pub fn spawn<F>(name: impl Into<String>, listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(event_source = %name, "Spawning listener");
        Self {
            handle: tokio::spawn(listener),
            name,
            finished: None,
        }
    }

    /// Wait for the listener to exit.
    ///
    /// Cancel safe, and returns the cached outcome once it is known.
    pub async fn outcome(&mut self) -> ListenerOutcome {
        if let Some(outcome) = &self.finished {
            return outcome.clone();
        }

        let outcome = match (&mut self.handle).await {
            Ok(()) => ListenerOutcome::CompletedNormally,
            Err(e) => {
                let reason = describe_fault(e);
                error!(
                    event_source = %self.name,
                    reason = %reason,
                    "Recovered event source from fault"
                );
                ListenerOutcome::Faulted(reason)
            }
        };
        self.finished = Some(outcome.clone());
        outcome
    }

    /// Cancel the listener at its next suspension point.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

fn describe_fault(e: JoinError) -> String {
    if e.is_cancelled() {
        return "listener was cancelled".to_string();
    }
    match e.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(e) => e.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "listener panicked".to_string()
    }
}
