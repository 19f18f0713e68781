//! trackd core library — domain types, environment defaults, argument
//! building, and log line classification for the trackd worker daemon.
//!
//! Everything here is deliberately free of async and process I/O so the
//! supervisor crate can be tested against pure functions:
//! - [`types`] — newtypes, enums, and the invocation snapshot
//! - [`env`] — platform-dependent defaults and port allocation
//! - [`args`] — [`args::build_args`]
//! - [`logparse`] — [`logparse::classify`]
//! - [`error`] — [`CoreError`]

pub mod args;
pub mod env;
pub mod error;
pub mod logparse;
pub mod types;

pub use error::CoreError;
pub use types::{
    DerivationRoot, KeyGroup, LogEvent, LogLevel, Network, RescanPolicy, WorkerConfig,
    READY_MARKER, WORKER_NAME,
};
