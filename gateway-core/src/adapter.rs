//! Streaming adapter.
//!
//! The adapter owns one listener for the lifetime of one `Start` call.
//! It multiplexes the listener's signals onto an outbound [`EventSink`]:
//!
//! - a data unit is forwarded as soon as it is taken, in production order;
//! - a listener error ends the call with that error;
//! - the outbound stream going away fires the done signal (exactly once)
//!   and ends the call normally;
//! - the listener exiting on its own (or faulting) ends the call with the
//!   outcome reported by the fault boundary.
//!
//! After done has fired the adapter waits at most
//! [`AdapterConfig::shutdown_grace`] for the listener to release its
//! connection, then aborts it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, warn};

use crate::boundary::{GuardedListener, ListenerOutcome};
use crate::errors::ExecutorError;
use crate::signals::{AdapterEndpoints, DataReceiver, DoneSender, ListenerSignals, listener_channels};

/// Default time a listener gets to stop after the done signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors raised by an outbound stream.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The consumer has gone away.
    #[error("outbound stream closed")]
    Closed,

    /// The transport failed while writing.
    #[error("{0}")]
    Transport(String),
}

/// The outbound side of a `Start` call.
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one data unit. May wait for the consumer to catch up.
    async fn send(&mut self, unit: Bytes) -> Result<(), SinkError>;

    /// Complete once the consumer has gone away.
    ///
    /// Must be cancel safe: the adapter polls it alongside the listener's
    /// signals and drops it whenever something else is ready first.
    async fn closed(&mut self);
}

#[async_trait]
impl EventSink for mpsc::Sender<Bytes> {
    async fn send(&mut self, unit: Bytes) -> Result<(), SinkError> {
        mpsc::Sender::send(self, unit)
            .await
            .map_err(|_| SinkError::Closed)
    }

    async fn closed(&mut self) {
        mpsc::Sender::closed(self).await
    }
}

/// Tuning for the streaming adapter.
#[derive(Debug, Clone, Copy)]
pub struct AdapterConfig {
    /// How long a listener may take to stop after the done signal.
    pub shutdown_grace: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Runs listeners and forwards their output.
///
/// Stateless between calls; every call to [`run`](StreamAdapter::run) gets
/// its own channels and its own listener task.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamAdapter {
    config: AdapterConfig,
}

enum Step {
    Failed(ExecutorError),
    SinkClosed,
    Data(Bytes),
    Exited(ListenerOutcome),
}

impl StreamAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Run one listener until the call ends.
    ///
    /// `listener` is handed the listener side of the signal channels and
    /// its future is spawned behind the fault boundary, inside the current
    /// tracing span.
    pub async fn run<S, F, Fut>(
        &self,
        name: &str,
        sink: &mut S,
        listener: F,
    ) -> Result<(), ExecutorError>
    where
        S: EventSink + ?Sized,
        F: FnOnce(ListenerSignals) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (signals, endpoints) = listener_channels();
        let AdapterEndpoints {
            data: mut data_rx,
            error: mut error_rx,
            done: mut done_tx,
        } = endpoints;

        let mut listener = GuardedListener::spawn(name, listener(signals).in_current_span());
        let mut error_open = true;
        let mut forwarded: u64 = 0;

        loop {
            let step = tokio::select! {
                biased;

                // A terminal error outranks everything else.
                result = &mut error_rx, if error_open => match result {
                    Ok(e) => Step::Failed(e),
                    Err(_) => {
                        error_open = false;
                        continue;
                    }
                },

                () = sink.closed() => Step::SinkClosed,

                Some(unit) = data_rx.recv() => Step::Data(unit),

                outcome = listener.outcome() => Step::Exited(outcome),
            };

            match step {
                Step::Data(unit) => {
                    match sink.send(unit).await {
                        Ok(()) => forwarded += 1,
                        Err(SinkError::Closed) => {
                            info!(event_source = %name, forwarded, "Outbound stream ended");
                            self.shut_down(name, &mut done_tx, data_rx, &mut listener)
                                .await;
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(event_source = %name, error = %e, "Failed to forward data unit");
                            self.shut_down(name, &mut done_tx, data_rx, &mut listener)
                                .await;
                            return Err(ExecutorError::Stream(e));
                        }
                    }
                }
                Step::SinkClosed => {
                    info!(event_source = %name, forwarded, "Outbound stream ended");
                    self.shut_down(name, &mut done_tx, data_rx, &mut listener)
                        .await;
                    return Ok(());
                }
                Step::Failed(e) => {
                    error!(event_source = %name, error = %e, "Event source failed");
                    self.shut_down(name, &mut done_tx, data_rx, &mut listener)
                        .await;
                    return Err(e);
                }
                Step::Exited(ListenerOutcome::CompletedNormally) => {
                    info!(event_source = %name, forwarded, "Listener finished");
                    return Ok(());
                }
                Step::Exited(ListenerOutcome::Faulted(reason)) => {
                    return Err(ExecutorError::ListenerFaulted {
                        name: name.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    /// Fire done, stop taking data, and give the listener a bounded window
    /// to exit.
    async fn shut_down(
        &self,
        name: &str,
        done: &mut DoneSender,
        data: DataReceiver,
        listener: &mut GuardedListener,
    ) {
        if done.fire() {
            debug!(event_source = %name, "Sent done signal to listener");
        }
        // Nothing is forwarded after done; this also releases a listener
        // parked mid-handoff.
        drop(data);

        let grace = self.config.shutdown_grace;
        match tokio::time::timeout(grace, listener.outcome()).await {
            Ok(ListenerOutcome::CompletedNormally) => {
                debug!(event_source = %name, "Listener stopped");
            }
            Ok(ListenerOutcome::Faulted(reason)) => {
                warn!(event_source = %name, reason = %reason, "Listener faulted while stopping");
            }
            Err(_) => {
                warn!(
                    event_source = %name,
                    grace_ms = grace.as_millis() as u64,
                    "Listener did not stop in time, aborting"
                );
                listener.abort();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn unit(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[tokio::test]
    async fn test_forwards_in_order_and_stops_on_sink_close() {
        let (mut sink, mut rx) = mpsc::channel::<Bytes>(1);
        let (released_tx, released_rx) = oneshot::channel::<()>();

        let call = tokio::spawn(async move {
            StreamAdapter::default()
                .run("ordered", &mut sink, |signals: ListenerSignals| async move {
                    let ListenerSignals {
                        data,
                        error: _error,
                        mut done,
                    } = signals;
                    for s in ["a", "b", "c"] {
                        if data.send(unit(s)).await.is_err() {
                            return;
                        }
                    }
                    done.wait().await;
                    let _ = released_tx.send(());
                })
                .await
        });

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(rx.recv().await.unwrap());
        }
        assert_eq!(received, vec![unit("a"), unit("b"), unit("c")]);

        drop(rx);
        assert!(call.await.unwrap().is_ok());
        tokio::time::timeout(Duration::from_secs(1), released_rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_ends_call_without_further_data() {
        let (mut sink, mut rx) = mpsc::channel::<Bytes>(8);

        let result = StreamAdapter::default()
            .run("failing", &mut sink, |signals: ListenerSignals| async move {
                if signals.data.send(unit("a")).await.is_err() {
                    return;
                }
                signals.fail(ExecutorError::Connection("connection reset".into()));
            })
            .await;
        drop(sink);

        assert!(matches!(result, Err(ExecutorError::Connection(_))));
        assert_eq!(rx.recv().await, Some(unit("a")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_setup_failure_forwards_nothing() {
        let (mut sink, mut rx) = mpsc::channel::<Bytes>(8);

        let result = StreamAdapter::default()
            .run("declare-fails", &mut sink, |signals: ListenerSignals| async move {
                signals.fail(ExecutorError::Connection(
                    "failed to declare exchange".into(),
                ));
            })
            .await;
        drop(sink);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to declare exchange"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_listener_fault_ends_call() {
        let (mut sink, _rx) = mpsc::channel::<Bytes>(8);

        let result = StreamAdapter::default()
            .run("faulty", &mut sink, |_signals: ListenerSignals| async move {
                panic!("listener bug");
            })
            .await;

        match result {
            Err(ExecutorError::ListenerFaulted { name, reason }) => {
                assert_eq!(name, "faulty");
                assert_eq!(reason, "listener bug");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listener_finishing_ends_call_normally() {
        let (mut sink, mut rx) = mpsc::channel::<Bytes>(8);

        let result = StreamAdapter::default()
            .run("finite", &mut sink, |signals: ListenerSignals| async move {
                let _ = signals.data.send(unit("only")).await;
            })
            .await;
        drop(sink);

        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some(unit("only")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_slow_sink_stalls_listener() {
        let (mut sink, mut rx) = mpsc::channel::<Bytes>(1);
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = produced.clone();

        let call = tokio::spawn(async move {
            StreamAdapter::default()
                .run("fast", &mut sink, move |signals: ListenerSignals| async move {
                    loop {
                        if signals.data.send(unit("tick")).await.is_err() {
                            return;
                        }
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await
        });

        // One unit sits in the sink, one is held by the adapter; the
        // listener is parked on its third handoff.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(produced.load(Ordering::SeqCst), 2);

        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(produced.load(Ordering::SeqCst), 3);

        drop(rx);
        assert!(call.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_unresponsive_listener_is_aborted_after_grace() {
        let (mut sink, rx) = mpsc::channel::<Bytes>(1);
        drop(rx);

        let adapter = StreamAdapter::new(AdapterConfig {
            shutdown_grace: Duration::from_millis(50),
        });
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            adapter.run("stubborn", &mut sink, |signals: ListenerSignals| async move {
                let _keep = signals;
                std::future::pending::<()>().await;
            }),
        )
        .await
        .unwrap();

        assert!(result.is_ok());
    }
}
