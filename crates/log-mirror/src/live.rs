//! Live tails of a mirror.
//!
//! A live tail receives every batch the mirror accepts, in order.
//!
//! # Design Principles
//!
//! - Tails are fed after rows are validated and the mirror is extended
//! - The initial load does not feed tails
//! - A dropped tail never blocks or fails a push

use std::sync::Mutex;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::types::Row;

/// A subscription to batches appended to a mirror.
pub struct LiveTail<T> {
    receiver: UnboundedReceiver<Vec<Row<T>>>,
}

impl<T> LiveTail<T> {
    fn new(receiver: UnboundedReceiver<Vec<Row<T>>>) -> Self {
        Self { receiver }
    }

    /// Waits for the next appended batch.
    ///
    /// Returns None once the mirror has been dropped.
    pub async fn recv(&mut self) -> Option<Vec<Row<T>>> {
        self.receiver.recv().await
    }

    /// Returns the next appended batch if one is already queued.
    pub fn try_recv(&mut self) -> Option<Vec<Row<T>>> {
        match self.receiver.try_recv() {
            Ok(batch) => Some(batch),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Fan-out of appended batches to every live tail.
#[derive(Debug)]
pub(crate) struct LiveHub<T> {
    subscribers: Mutex<Vec<UnboundedSender<Vec<Row<T>>>>>,
}

impl<T: Clone> LiveHub<T> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new tail. Batches appended before this call are not seen.
    pub(crate) fn subscribe(&self) -> LiveTail<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("lock poisoned").push(sender);
        LiveTail::new(receiver)
    }

    /// Sends a batch to every tail, pruning tails whose receiver is gone.
    pub(crate) fn notify(&self, batch: &[Row<T>]) {
        let mut subscribers = self.subscribers.lock().expect("lock poisoned");
        subscribers.retain(|sender| sender.send(batch.to_vec()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("lock poisoned").len()
    }
}
