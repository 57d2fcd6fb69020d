//! Named broadcast channels.
//!
//! A channel carries no payload beyond "check for changes". Delivery is
//! at-most-once and only to listeners subscribed at publish time; anything a
//! listener misses is recovered by polling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Default number of signals a lagging subscriber may fall behind by.
const DEFAULT_CAPACITY: usize = 64;

/// Errors from a broadcast channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid channel name: {0:?}")]
    InvalidName(String),

    #[error("channel transport failed: {0}")]
    Transport(String),
}

/// A live subscription to one channel.
pub struct Subscription {
    channel: String,
    receiver: broadcast::Receiver<()>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, receiver: broadcast::Receiver<()>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
        }
    }

    /// The channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next signal.
    ///
    /// Returns None once the channel is closed. Lagging counts as a signal:
    /// the dropped signals all meant "check for changes" anyway.
    pub async fn recv(&mut self) -> Option<()> {
        match self.receiver.recv().await {
            Ok(()) => Some(()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(channel = %self.channel, skipped, "Subscriber lagged, coalescing signals");
                Some(())
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Discards every signal already queued and returns how many there were.
    pub fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(()) => drained += 1,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    drained += skipped as usize;
                }
                Err(_) => return drained,
            }
        }
    }
}

/// A publish/subscribe medium of named channels.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Broadcasts a signal on `channel`. Succeeds even with no listeners.
    async fn publish(&self, channel: &str) -> Result<(), ChannelError>;

    /// Subscribes to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, ChannelError>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Arc<C> {
    async fn publish(&self, channel: &str) -> Result<(), ChannelError> {
        (**self).publish(channel).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, ChannelError> {
        (**self).subscribe(channel).await
    }
}

/// In-process channels backed by tokio broadcast senders.
///
/// Every clone shares the same set of channels, so writers and listeners in
/// one process see each other's signals.
#[derive(Clone)]
pub struct LocalChannels {
    senders: Arc<RwLock<HashMap<String, broadcast::Sender<()>>>>,
    capacity: usize,
}

impl LocalChannels {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates channels whose subscribers may lag by up to `capacity` signals.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            senders: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Closes a channel. Current subscribers see the end of their stream.
    pub async fn close(&self, channel: &str) {
        if self.senders.write().await.remove(channel).is_some() {
            debug!(channel, "Closed channel");
        }
    }

    /// Returns the number of live subscribers on a channel.
    pub async fn receiver_count(&self, channel: &str) -> usize {
        self.senders
            .read()
            .await
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Removes channels nobody listens on anymore.
    pub async fn cleanup(&self) {
        let mut senders = self.senders.write().await;
        let before = senders.len();
        senders.retain(|_, sender| sender.receiver_count() > 0);
        let removed = before - senders.len();
        if removed > 0 {
            debug!(removed, "Dropped channels without subscribers");
        }
    }
}

impl Default for LocalChannels {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(channel: &str) -> Result<(), ChannelError> {
    if channel.trim().is_empty() {
        return Err(ChannelError::InvalidName(channel.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Channel for LocalChannels {
    async fn publish(&self, channel: &str) -> Result<(), ChannelError> {
        check_name(channel)?;
        let senders = self.senders.read().await;
        if let Some(sender) = senders.get(channel) {
            // No receivers is not an error; the signal is simply lost.
            let delivered = sender.send(()).unwrap_or(0);
            debug!(channel, delivered, "Published change signal");
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, ChannelError> {
        check_name(channel)?;
        let mut senders = self.senders.write().await;
        let capacity = self.capacity;
        let sender = senders.entry(channel.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(capacity);
            tx
        });
        Ok(Subscription::new(channel, sender.subscribe()))
    }
}
