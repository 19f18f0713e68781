//! Supervisor for the trackd worker daemon: keeps one external indexer
//! process in sync with the wallets the host has loaded, watches its
//! output for the readiness banner, and points the host's Electrum
//! connection at it once it is serving.
//!
//! Embedding sketch:
//! 1. [`hosts::preserve_single_server`] once when enabling;
//! 2. build a [`Supervisor`] from a [`SupervisorConfig`] and the host's
//!    [`hosts::NetworkBackend`];
//! 3. wrap it in a [`MembershipTracker`] and feed it the host's wallet
//!    loaded/unloaded/teardown notifications from one control context.

pub mod config;
mod error;
pub mod hosts;
pub mod membership;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use membership::{MembershipTracker, WorkerControl};
pub use supervisor::{Supervisor, SupervisorState};

/// Install a default tracing subscriber (`RUST_LOG`-style filtering,
/// `info` fallback). Hosts with their own subscriber skip this.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
