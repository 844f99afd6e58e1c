//! In-memory session store with inactivity-based eviction.
//!
//! This crate provides:
//! - A thread-safe [`SessionStore`] keyed by generated identifiers
//! - An access-ordered view of sessions for cheap eviction candidates
//! - A background sweeper, owned by [`SessionManager`], that removes
//!   sessions not updated within the configured idle timeout
//! - Injectable [`Clock`] and [`IdGenerator`] collaborators for testing
//!
//! Reads never refresh a session; only updates do.
//!
//! # Example
//!
//! ```rust,ignore
//! use lapse_session::{SessionManager, StoreConfig};
//!
//! let manager = SessionManager::new(StoreConfig::default())?;
//! let id = manager.create_session()?;
//! manager.update_session_data(&id, payload)?;
//! let data = manager.get_session_data(&id)?;
//! ```

mod clock;
mod config;
mod error;
mod id;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, StoreConfig};
pub use error::{Error, IdGenerationError, Result};
pub use id::{IdGenerator, UuidGenerator};
pub use store::{
    EvictOutcome, Payload, SessionSnapshot, SessionStore, SessionStoreBuilder, StoreStats,
};
pub use sweeper::SessionManager;
