//! CLI command handlers.

pub mod demo;
pub mod load;

use lapse_session::StoreConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Resolved store configuration.
    pub store: StoreConfig,
}
