//! Error types for trackd-core.

use thiserror::Error;

/// All errors that can arise from the pure core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The host is running on a chain the worker cannot serve.
    /// Fatal to enabling the supervisor; no worker is launched.
    #[error("unsupported network {chain}")]
    UnsupportedNetwork { chain: String },
}
