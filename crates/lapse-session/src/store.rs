//! Session store with access-ordered eviction candidates.
//!
//! Sessions live in a single [`LruCache`] that serves as both the lookup
//! index (id to entry) and the access-order sequence (most recently touched
//! at the front, least recently touched at the back). Inserting, promoting
//! and popping are each one operation on that structure, so the index and
//! the sequence can never disagree about which sessions exist.
//!
//! # Recency policy
//!
//! Only [`SessionStore::update_session_data`] refreshes a session. Reads via
//! [`SessionStore::get_session_data`] leave both the timestamp and the
//! position in the access order untouched, so a session that is polled but
//! never written still expires after the idle timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{Error, IdGenerationError, Result};
use crate::id::{IdGenerator, UuidGenerator};

/// Default session payload: a JSON object keyed by string.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A session as held by the store.
#[derive(Debug)]
struct Session<V> {
    id: String,
    data: V,
    last_access: Instant,
}

/// Identity and age of a stored session, detached from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: String,

    /// When the session was created or last updated.
    pub last_access: Instant,
}

/// Result of a single [`SessionStore::evict_if_stale`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictOutcome {
    /// The store holds no sessions.
    Empty,

    /// The least recently used session was stale and has been removed.
    Evicted(String),

    /// The least recently used session was still fresh and was moved to the
    /// front so the next step inspects a different entry.
    Rotated(String),
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Number of live sessions.
    pub size: usize,

    /// Configured inactivity threshold.
    pub idle_timeout: Duration,

    /// Sessions evicted since the store was created.
    pub evicted_total: u64,
}

/// State shared by every handle to one store.
struct StoreInner<V> {
    /// Lookup index and access-order sequence, guarded by one lock.
    sessions: Mutex<LruCache<String, Session<V>>>,

    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    evicted_total: AtomicU64,
}

/// Thread-safe in-memory session store.
///
/// Cloning yields another handle to the same sessions. Every operation takes
/// the single store lock for O(1) work and never blocks on anything else
/// while holding it.
pub struct SessionStore<V = Payload> {
    inner: Arc<StoreInner<V>>,
    config: StoreConfig,
}

/// Builder for a [`SessionStore`] with injected collaborators.
pub struct SessionStoreBuilder<V = Payload> {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    _payload: std::marker::PhantomData<fn() -> V>,
}

impl<V> SessionStoreBuilder<V>
where
    V: Clone + Default + Send + 'static,
{
    fn new(config: StoreConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            _payload: std::marker::PhantomData,
        }
    }

    /// Use the given clock for timestamps and staleness checks.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use the given identifier source for new sessions.
    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Validate the configuration and build the store.
    pub fn build(self) -> Result<SessionStore<V>> {
        self.config.validate()?;

        let inner = StoreInner {
            sessions: Mutex::new(LruCache::unbounded()),
            clock: self.clock,
            ids: self.ids,
            evicted_total: AtomicU64::new(0),
        };

        Ok(SessionStore {
            inner: Arc::new(inner),
            config: self.config,
        })
    }
}

impl SessionStore<Payload> {
    /// Create a store with JSON payloads, the system clock and UUID
    /// identifiers.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::builder(config).build()
    }
}

impl<V> SessionStore<V>
where
    V: Clone + Default + Send + 'static,
{
    /// Start building a store with custom collaborators.
    pub fn builder(config: StoreConfig) -> SessionStoreBuilder<V> {
        SessionStoreBuilder::new(config)
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the configured inactivity threshold.
    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout
    }

    /// Create an empty session and return its identifier.
    ///
    /// The identifier is generated before the lock is taken. If generation
    /// fails, or yields an identifier that is already live, nothing is
    /// inserted.
    pub fn create_session(&self) -> Result<String> {
        let id = self.inner.ids.generate()?;

        let mut sessions = self.inner.sessions.lock();
        if sessions.contains(&id) {
            return Err(Error::IdGeneration(IdGenerationError::new(format!(
                "identifier {id} is already in use"
            ))));
        }

        let session = Session {
            id: id.clone(),
            data: V::default(),
            last_access: self.inner.clock.now(),
        };
        sessions.put(id.clone(), session);
        let size = sessions.len();
        drop(sessions);

        debug!(session_id = %id, size, "Session created");
        Ok(id)
    }

    /// Get a copy of the session's payload.
    ///
    /// Does not refresh the session; see the module docs.
    pub fn get_session_data(&self, session_id: &str) -> Result<V> {
        let sessions = self.inner.sessions.lock();
        match sessions.peek(session_id) {
            Some(session) => {
                let data = session.data.clone();
                drop(sessions);
                trace!(session_id = %session_id, "Session read");
                Ok(data)
            }
            None => Err(Error::NotFound(session_id.to_string())),
        }
    }

    /// Replace the session's payload and mark it as just used.
    ///
    /// The payload is swapped in whole, never merged. The session moves to
    /// the front of the access order.
    pub fn update_session_data(&self, session_id: &str, data: V) -> Result<()> {
        let mut sessions = self.inner.sessions.lock();
        let now = self.inner.clock.now();

        let previous = match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_access = now;
                std::mem::replace(&mut session.data, data)
            }
            None => return Err(Error::NotFound(session_id.to_string())),
        };
        drop(sessions);

        // Old payload is released outside the lock.
        drop(previous);

        trace!(session_id = %session_id, "Session updated");
        Ok(())
    }

    /// Check whether a session is live, without refreshing it.
    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.sessions.lock().contains(session_id)
    }

    /// When the session was created or last updated.
    pub fn last_access(&self, session_id: &str) -> Option<Instant> {
        self.inner
            .sessions
            .lock()
            .peek(session_id)
            .map(|s| s.last_access)
    }

    /// Get the number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            size: self.len(),
            idle_timeout: self.config.idle_timeout,
            evicted_total: self.inner.evicted_total.load(Ordering::Relaxed),
        }
    }

    /// Look at the back of the access order without changing anything.
    pub fn peek_least_recently_used(&self) -> Option<SessionSnapshot> {
        self.inner
            .sessions
            .lock()
            .peek_lru()
            .map(|(_, session)| SessionSnapshot {
                id: session.id.clone(),
                last_access: session.last_access,
            })
    }

    /// Inspect the least recently used session and act on it in one step.
    ///
    /// If it has been idle for at least `threshold` it is removed. Otherwise
    /// it is moved to the front, so repeated calls walk the whole store
    /// instead of re-inspecting the same fresh entry.
    pub fn evict_if_stale(&self, threshold: Duration) -> EvictOutcome {
        let mut sessions = self.inner.sessions.lock();

        let (id, idle) = match sessions.peek_lru() {
            Some((id, session)) => (
                id.clone(),
                self.inner.clock.elapsed_since(session.last_access),
            ),
            None => return EvictOutcome::Empty,
        };

        if idle < threshold {
            sessions.promote(&id);
            drop(sessions);
            trace!(session_id = %id, idle_ms = idle.as_millis() as u64, "Session still fresh");
            return EvictOutcome::Rotated(id);
        }

        let evicted = sessions.pop_lru();
        let remaining = sessions.len();
        drop(sessions);
        drop(evicted);

        self.inner.evicted_total.fetch_add(1, Ordering::Relaxed);
        debug!(
            session_id = %id,
            idle_ms = idle.as_millis() as u64,
            remaining,
            "Evicted idle session"
        );
        EvictOutcome::Evicted(id)
    }

    /// Run one eviction pass over the store.
    ///
    /// Steps [`evict_if_stale`](Self::evict_if_stale) once per session
    /// present when the pass starts, taking the lock separately for each
    /// step. Every session that was not updated during the pass is
    /// inspected exactly once. Returns the number of sessions evicted.
    pub fn sweep(&self) -> usize {
        let threshold = self.config.idle_timeout;
        let pending = self.len();
        let mut evicted = 0;

        for _ in 0..pending {
            match self.evict_if_stale(threshold) {
                EvictOutcome::Evicted(_) => evicted += 1,
                EvictOutcome::Rotated(_) => {}
                EvictOutcome::Empty => break,
            }
        }

        if evicted > 0 {
            debug!(evicted, inspected = pending, "Sweep pass finished");
        }

        evicted
    }

    /// Verify that index and access order describe the same sessions.
    #[cfg(test)]
    pub(crate) fn audit(&self) -> std::result::Result<(), String> {
        use std::collections::HashSet;

        let sessions = self.inner.sessions.lock();
        let mut seen = HashSet::new();
        let mut last = None;

        for (key, session) in sessions.iter() {
            if *key != session.id {
                return Err(format!("key {key} holds session {}", session.id));
            }
            if !seen.insert(key.clone()) {
                return Err(format!("session {key} appears twice in access order"));
            }
            last = Some(key.clone());
        }

        let back = sessions.peek_lru().map(|(key, _)| key.clone());
        if back != last {
            return Err(format!(
                "back of access order is {last:?}, eviction candidate is {back:?}"
            ));
        }

        if seen.len() != sessions.len() {
            return Err(format!(
                "access order has {} entries, index has {}",
                seen.len(),
                sessions.len()
            ));
        }

        Ok(())
    }

    /// Session ids from most to least recently touched.
    #[cfg(test)]
    pub(crate) fn access_order(&self) -> Vec<String> {
        self.inner
            .sessions
            .lock()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl<V> Clone for SessionStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<V> std::fmt::Debug for SessionStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("clock", &self.inner.clock)
            .field("ids", &self.inner.ids)
            .finish_non_exhaustive()
    }
}
