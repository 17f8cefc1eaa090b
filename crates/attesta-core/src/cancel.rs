//! Request cancellation and deadlines.
//!
//! A `CancelHandle` is kept by whoever may abandon the request; the matching
//! `CancelSignal` travels with the request. `Interrupt` combines the signal
//! with an optional deadline and races it against pipeline stages, so a
//! stage's in-flight engine calls are dropped the moment either fires.

use std::future::Future;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a request stopped before reaching a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

/// Cancels the request tied to the matching `CancelSignal`.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even with no live receivers.
        self.tx.send_replace(true);
    }
}

/// The receiving side of a cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the request is cancelled. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Cancellation plus an optional deadline for one request.
#[derive(Debug, Clone)]
pub struct Interrupt {
    signal: CancelSignal,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new(signal: CancelSignal, deadline: Option<Instant>) -> Self {
        Self { signal, deadline }
    }

    /// Resolve with the first interruption to occur.
    pub async fn wait(&self) -> Interruption {
        match self.deadline {
            Some(at) => tokio::select! {
                _ = self.signal.cancelled() => Interruption::Cancelled,
                _ = tokio::time::sleep_until(at) => Interruption::DeadlineExceeded,
            },
            None => {
                self.signal.cancelled().await;
                Interruption::Cancelled
            }
        }
    }

    /// Run `fut` unless interrupted first. An already-fired interruption wins
    /// without polling `fut`.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interruption> {
        tokio::select! {
            biased;
            reason = self.wait() => Err(reason),
            out = fut => Ok(out),
        }
    }
}
