//! Background eviction of idle sessions.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::{Payload, SessionStore};

/// Handle to the running sweeper task.
struct Sweeper {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Sweeper {
    fn spawn<V>(store: SessionStore<V>) -> Result<Self>
    where
        V: Clone + Default + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval = store.config().sweep_interval;

        let task = runtime.spawn(async move {
            run_sweeper(store, interval, token).await;
        });

        Ok(Self { cancel, task })
    }
}

/// Sweep the store once per tick until cancelled.
async fn run_sweeper<V>(store: SessionStore<V>, interval: Duration, cancel: CancellationToken)
where
    V: Clone + Default + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        idle_timeout_ms = store.idle_timeout().as_millis() as u64,
        sweep_interval_ms = interval.as_millis() as u64,
        "Session sweeper started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = store.sweep();
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "Swept idle sessions");
                }
            }
        }
    }

    info!("Session sweeper stopped");
}

/// Session store paired with its background sweeper.
///
/// The sweeper is spawned on construction and lives exactly as long as the
/// manager: [`shutdown`](Self::shutdown) stops it and waits for it to finish,
/// and dropping the manager cancels it.
///
/// Construction spawns a Tokio task and fails with [`Error::NoRuntime`]
/// outside a Tokio runtime, unless the sweeper is disabled.
pub struct SessionManager<V = Payload>
where
    V: Clone + Default + Send + 'static,
{
    store: SessionStore<V>,
    sweeper: Option<Sweeper>,
}

impl SessionManager<Payload> {
    /// Create a manager with JSON payloads, the system clock and UUID
    /// identifiers.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_store(SessionStore::new(config)?)
    }
}

impl<V> SessionManager<V>
where
    V: Clone + Default + Send + 'static,
{
    /// Wrap an existing store, starting the sweeper if the store's
    /// configuration enables it.
    pub fn with_store(store: SessionStore<V>) -> Result<Self> {
        let sweeper = if store.config().enable_sweeper {
            Some(Sweeper::spawn(store.clone())?)
        } else {
            debug!("Background sweeper disabled by configuration");
            None
        };

        Ok(Self { store, sweeper })
    }

    /// Get the underlying store.
    pub fn store(&self) -> &SessionStore<V> {
        &self.store
    }

    /// Create an empty session and return its identifier.
    pub fn create_session(&self) -> Result<String> {
        self.store.create_session()
    }

    /// Get a copy of the session's payload. Does not refresh the session.
    pub fn get_session_data(&self, session_id: &str) -> Result<V> {
        self.store.get_session_data(session_id)
    }

    /// Replace the session's payload and refresh it.
    pub fn update_session_data(&self, session_id: &str, data: V) -> Result<()> {
        self.store.update_session_data(session_id, data)
    }

    /// Whether the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .as_ref()
            .is_some_and(|s| !s.cancel.is_cancelled() && !s.task.is_finished())
    }

    /// Stop the sweeper and wait for it to exit.
    ///
    /// Sessions stay readable through [`store`](Self::store) handles cloned
    /// earlier, but nothing evicts them any more.
    pub async fn shutdown(mut self) {
        let Some(sweeper) = self.sweeper.take() else {
            return;
        };

        sweeper.cancel.cancel();
        if let Err(e) = sweeper.task.await {
            warn!(error = %e, "Session sweeper task ended abnormally");
        }
    }
}

impl<V> Drop for SessionManager<V>
where
    V: Clone + Default + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.cancel.cancel();
        }
    }
}

impl<V> std::fmt::Debug for SessionManager<V>
where
    V: Clone + Default + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}
