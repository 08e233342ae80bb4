//! Per-listener signal channels.
//!
//! Every running listener is wired to its streaming adapter by exactly
//! three channels:
//!
//! - **data**: a synchronous handoff. [`DataSender::send`] resumes only
//!   once the adapter has taken the unit, so a slow outbound stream stalls
//!   the listener's next production step.
//! - **error**: single-shot, listener → adapter. Sending consumes the
//!   sender, so a listener can report at most one error.
//! - **done**: single-shot, adapter → listener. Fired at most once to
//!   request shutdown.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::errors::ExecutorError;

/// The peer side of a signal channel has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal channel closed")]
pub struct SignalClosed;

struct Handoff {
    unit: Bytes,
    taken: oneshot::Sender<()>,
}

/// Listener side of the data channel.
pub struct DataSender {
    tx: mpsc::Sender<Handoff>,
}

impl DataSender {
    /// Hand one data unit to the adapter and wait until it has been taken.
    ///
    /// Fails once the adapter has stopped forwarding; the listener must
    /// then wind down.
    pub async fn send(&self, unit: impl Into<Bytes>) -> Result<(), SignalClosed> {
        let (taken, taken_rx) = oneshot::channel();
        self.tx
            .send(Handoff {
                unit: unit.into(),
                taken,
            })
            .await
            .map_err(|_| SignalClosed)?;
        taken_rx.await.map_err(|_| SignalClosed)
    }
}

/// Adapter side of the data channel.
pub struct DataReceiver {
    rx: mpsc::Receiver<Handoff>,
}

impl DataReceiver {
    /// Take the next data unit, releasing the blocked sender.
    ///
    /// Cancel safe. Returns `None` once the listener has dropped its
    /// sender and nothing is pending.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let Handoff { unit, taken } = self.rx.recv().await?;
        let _ = taken.send(());
        Some(unit)
    }
}

/// Listener side of the error channel.
pub struct ErrorSender {
    tx: oneshot::Sender<ExecutorError>,
}

impl ErrorSender {
    /// Report the listener's terminal error.
    pub fn send(self, error: ExecutorError) {
        // The adapter may already be gone; nobody is left to tell.
        let _ = self.tx.send(error);
    }
}

/// Adapter side of the error channel.
pub type ErrorReceiver = oneshot::Receiver<ExecutorError>;

/// Adapter side of the done channel.
pub struct DoneSender {
    tx: Option<oneshot::Sender<()>>,
}

impl DoneSender {
    /// Ask the listener to stop. Returns `true` only on the first call.
    pub fn fire(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }
}

/// Listener side of the done channel.
pub struct DoneReceiver {
    rx: oneshot::Receiver<()>,
    observed: bool,
}

impl DoneReceiver {
    /// Wait for the shutdown request.
    ///
    /// Also completes if the adapter is dropped without firing, since
    /// nobody is left to consume data. Cancel safe and may be awaited
    /// again after it has completed.
    pub async fn wait(&mut self) {
        if self.observed {
            return;
        }
        let _ = (&mut self.rx).await;
        self.observed = true;
    }
}

/// Everything a listener task receives from its adapter.
pub struct ListenerSignals {
    pub data: DataSender,
    pub error: ErrorSender,
    pub done: DoneReceiver,
}

impl ListenerSignals {
    /// Report a terminal error and give up the data channel with it.
    pub fn fail(self, error: ExecutorError) {
        self.error.send(error);
    }
}

/// Everything the adapter keeps for one listener.
pub struct AdapterEndpoints {
    pub data: DataReceiver,
    pub error: ErrorReceiver,
    pub done: DoneSender,
}

/// Create the three signal channels for one listener.
pub fn listener_channels() -> (ListenerSignals, AdapterEndpoints) {
    // Capacity one is the floor for tokio mpsc; the `taken` ack turns it
    // into a rendezvous.
    let (data_tx, data_rx) = mpsc::channel(1);
    let (error_tx, error_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();

    (
        ListenerSignals {
            data: DataSender { tx: data_tx },
            error: ErrorSender { tx: error_tx },
            done: DoneReceiver {
                rx: done_rx,
                observed: false,
            },
        },
        AdapterEndpoints {
            data: DataReceiver { rx: data_rx },
            error: error_rx,
            done: DoneSender { tx: Some(done_tx) },
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_data_send_waits_for_handoff() {
        let (signals, mut endpoints) = listener_channels();

        let sender = tokio::spawn(async move {
            signals.data.send(Bytes::from_static(b"a")).await.unwrap();
            signals.data.send(Bytes::from_static(b"b")).await
        });

        // Nobody has taken "a" yet, so the sender is still parked.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sender.is_finished());

        assert_eq!(endpoints.data.recv().await.unwrap(), "a");
        assert_eq!(endpoints.data.recv().await.unwrap(), "b");
        assert_eq!(sender.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_data_send_fails_after_receiver_dropped() {
        let (signals, endpoints) = listener_channels();
        drop(endpoints);
        assert_eq!(signals.data.send("x").await, Err(SignalClosed));
    }

    #[tokio::test]
    async fn test_done_fires_once() {
        let (mut signals, mut endpoints) = listener_channels();
        assert!(endpoints.done.fire());
        assert!(!endpoints.done.fire());

        signals.done.wait().await;
        // Waiting again after observing done returns immediately.
        signals.done.wait().await;
    }

    #[tokio::test]
    async fn test_done_completes_when_adapter_dropped() {
        let (mut signals, endpoints) = listener_channels();
        drop(endpoints);
        tokio::time::timeout(Duration::from_secs(1), signals.done.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fail_delivers_single_error() {
        let (signals, endpoints) = listener_channels();
        signals.fail(ExecutorError::Connection("refused".into()));
        let err = endpoints.error.await.unwrap();
        assert!(matches!(err, ExecutorError::Connection(reason) if reason == "refused"));
    }
}
