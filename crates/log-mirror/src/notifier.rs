//! Change notifier.
//!
//! Wraps one named broadcast channel. Writers call [`Notifier::notify`] after
//! a durable append; a listening notifier reacts by draining: it polls every
//! registered pollable in registration order, then steps the reactor once.
//!
//! # States
//!
//! ```text
//! Idle ──start()──► Listening ──stop()──► Idle
//! ```
//!
//! Both transitions are idempotent. A failed `start()` leaves the notifier
//! `Idle`.
//!
//! # Batching
//!
//! Signals that queue up while a drain is running are coalesced into the next
//! drain, so N notifications produce at most one step per drain cycle and
//! never one step per row. Drains never interleave, whether triggered by a
//! signal or by [`Notifier::drain_now`].
//!
//! # Missed signals
//!
//! Signals sent while nobody is listening are lost. Callers self-heal with
//! [`Notifier::drain_now`] (on a timer, after reconnecting) or by polling
//! engines directly.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{Channel, Subscription};
use crate::engine::SyncEngine;
use crate::reactor::Reactor;
use crate::schema::Schema;
use crate::store::LogStore;
use crate::SyncResult;

const REPORT_CAPACITY: usize = 16;

/// Something a notifier keeps converged on every drain.
#[async_trait]
pub trait Pollable: Send + Sync + 'static {
    /// Name used in logs and drain reports.
    fn name(&self) -> &str;

    /// Catches up with the store. Returns the number of rows applied.
    async fn poll(&self) -> SyncResult<usize>;
}

#[async_trait]
impl<S: Schema, L: LogStore> Pollable for SyncEngine<S, L> {
    fn name(&self) -> &str {
        self.store().name()
    }

    async fn poll(&self) -> SyncResult<usize> {
        SyncEngine::poll(self).await
    }
}

/// Observable notifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierStatus {
    Idle,
    Listening,
}

enum NotifierState {
    Idle,
    Listening {
        stop_tx: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
}

/// A pollable that failed during a drain.
#[derive(Debug, Clone)]
pub struct PollFailure {
    pub pollable: String,
    pub error: String,
}

/// Outcome of one drain cycle.
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// Channel signals this drain absorbed; zero for a manual drain.
    pub signals: usize,
    /// Pollables polled, in registration order.
    pub pollables: usize,
    /// Rows applied across all pollables.
    pub appended: usize,
    pub failures: Vec<PollFailure>,
}

impl DrainReport {
    /// True if every pollable caught up without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Shared<R> {
    registry: RwLock<Vec<Arc<dyn Pollable>>>,
    reactor: R,
    drain_lock: Mutex<()>,
    reports: broadcast::Sender<DrainReport>,
}

impl<R: Reactor> Shared<R> {
    /// Polls every pollable, then steps the reactor exactly once.
    ///
    /// A failing pollable is recorded and does not stop the others.
    async fn drain(&self, signals: usize) -> DrainReport {
        let _guard = self.drain_lock.lock().await;

        let pollables: Vec<Arc<dyn Pollable>> = self.registry.read().expect("lock poisoned").clone();
        let mut report = DrainReport {
            signals,
            pollables: pollables.len(),
            ..DrainReport::default()
        };

        for pollable in &pollables {
            match pollable.poll().await {
                Ok(appended) => report.appended += appended,
                Err(e) => {
                    warn!(pollable = pollable.name(), error = %e, "Pollable failed to catch up");
                    report.failures.push(PollFailure {
                        pollable: pollable.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.reactor.step();
        debug!(
            signals = report.signals,
            pollables = report.pollables,
            appended = report.appended,
            failures = report.failures.len(),
            "Drain complete"
        );

        let _ = self.reports.send(report.clone());
        report
    }
}

/// Broadcasts change signals and keeps registered pollables converged.
pub struct Notifier<R: Reactor> {
    channel: Arc<dyn Channel>,
    name: String,
    state: Mutex<NotifierState>,
    shared: Arc<Shared<R>>,
}

impl<R: Reactor> Notifier<R> {
    /// Creates an idle notifier on the channel `name`.
    pub fn new(channel: Arc<dyn Channel>, name: impl Into<String>, reactor: R) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Self {
            channel,
            name: name.into(),
            state: Mutex::new(NotifierState::Idle),
            shared: Arc::new(Shared {
                registry: RwLock::new(Vec::new()),
                reactor,
                drain_lock: Mutex::new(()),
                reports,
            }),
        }
    }

    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reactor.
    pub fn reactor(&self) -> &R {
        &self.shared.reactor
    }

    /// Adds a pollable. Takes effect from the next drain on.
    pub fn register(&self, pollable: Arc<dyn Pollable>) {
        debug!(channel = %self.name, pollable = pollable.name(), "Registered pollable");
        self.shared.registry.write().expect("lock poisoned").push(pollable);
    }

    pub fn pollable_count(&self) -> usize {
        self.shared.registry.read().expect("lock poisoned").len()
    }

    /// Returns the current state.
    pub async fn status(&self) -> NotifierStatus {
        match &*self.state.lock().await {
            NotifierState::Listening { task, .. } if !task.is_finished() => NotifierStatus::Listening,
            _ => NotifierStatus::Idle,
        }
    }

    /// Subscribes to the channel and starts listening.
    ///
    /// A no-op while already listening. If subscribing fails, the error is
    /// returned and the notifier stays idle.
    pub async fn start(&self) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        if let NotifierState::Listening { task, .. } = &*state {
            if !task.is_finished() {
                return Ok(());
            }
            debug!(channel = %self.name, "Listener ended on its own, restarting");
            *state = NotifierState::Idle;
        }

        let subscription = self.channel.subscribe(&self.name).await?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(listen(shared, subscription, stop_rx));

        *state = NotifierState::Listening { stop_tx, task };
        info!(channel = %self.name, "Notifier listening");
        Ok(())
    }

    /// Stops listening and releases the subscription.
    ///
    /// A drain already in progress finishes first; nothing is delivered after
    /// this returns. A no-op while idle.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let NotifierState::Listening { stop_tx, task } = std::mem::replace(&mut *state, NotifierState::Idle)
        else {
            return;
        };

        let _ = stop_tx.send(());
        if let Err(e) = task.await {
            warn!(channel = %self.name, error = %e, "Listener task ended abnormally");
        }
        info!(channel = %self.name, "Notifier stopped");
    }

    /// Broadcasts a change signal on the channel.
    ///
    /// Fire-and-forget: listeners that are not subscribed right now never see it.
    pub async fn notify(&self) -> SyncResult<()> {
        self.channel.publish(&self.name).await?;
        Ok(())
    }

    /// Runs one drain cycle immediately, regardless of state.
    pub async fn drain_now(&self) -> DrainReport {
        self.shared.drain(0).await
    }

    /// Subscribes to the reports of every drain from now on.
    pub fn reports(&self) -> broadcast::Receiver<DrainReport> {
        self.shared.reports.subscribe()
    }
}

impl<R: Reactor> Drop for Notifier<R> {
    fn drop(&mut self) {
        if let NotifierState::Listening { stop_tx, .. } =
            std::mem::replace(self.state.get_mut(), NotifierState::Idle)
        {
            let _ = stop_tx.send(());
        }
    }
}

async fn listen<R: Reactor>(
    shared: Arc<Shared<R>>,
    mut subscription: Subscription,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                debug!(channel = subscription.channel(), "Listener received stop");
                break;
            }
            signal = subscription.recv() => {
                match signal {
                    Some(()) => {
                        let signals = 1 + subscription.drain_pending();
                        shared.drain(signals).await;
                    }
                    None => {
                        warn!(channel = subscription.channel(), "Channel closed, listener exiting");
                        break;
                    }
                }
            }
        }
    }
}
