//! Zero-capacity handoff between producers and consumers.
//!
//! # Responsibilities
//! - Suspend a producer until a consumer has taken its item
//! - Let any number of consumers wait; the first in line gets the next item
//! - Turn `recv` into end-of-stream once closed and drained
//!
//! # Design Decisions
//! - Tokio has no zero-capacity mpsc; a capacity-one channel plus a
//!   per-item claim acknowledgement gives the same producer-side semantics
//! - Consumers queue on a fair `tokio::sync::Mutex` around the receiver
//! - The sender lives in an `ArcSwapOption` so `close` never waits on a
//!   consumer that is parked in `recv`

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::ProtocolError;

struct Handoff<T> {
    item: T,
    claimed: oneshot::Sender<()>,
}

/// Unbuffered, multi-producer multi-consumer handoff queue.
pub struct Rendezvous<T> {
    tx: ArcSwapOption<mpsc::Sender<Handoff<T>>>,
    rx: Mutex<mpsc::Receiver<Handoff<T>>>,
}

impl<T: Send> Rendezvous<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx: ArcSwapOption::from_pointee(tx),
            rx: Mutex::new(rx),
        }
    }

    /// Hand `item` to a consumer. Returns once a consumer has claimed it.
    ///
    /// Fails with `ProtocolError::Closed` if the queue is closed, or is
    /// closed and dropped before the item was claimed.
    pub async fn send(&self, item: T) -> Result<(), ProtocolError> {
        let tx = self.tx.load_full().ok_or(ProtocolError::Closed)?;
        let (claimed_tx, claimed_rx) = oneshot::channel();

        tx.send(Handoff {
            item,
            claimed: claimed_tx,
        })
        .await
        .map_err(|_| ProtocolError::Closed)?;
        // Release our sender clone before parking so close() can drain
        drop(tx);

        claimed_rx.await.map_err(|_| ProtocolError::Closed)
    }

    /// Take the next item. `None` means closed and drained.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        let handoff = rx.recv().await?;
        // The producer may have given up; the item is still ours
        let _ = handoff.claimed.send(());
        Some(handoff.item)
    }

    /// Stop accepting items. Items already queued can still be received.
    pub fn close(&self) {
        self.tx.store(None);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.load().is_none()
    }
}

impl<T: Send> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rendezvous")
            .field("closed", &self.tx.load().is_none())
            .finish()
    }
}
