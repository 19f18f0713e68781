//! Domain types for the trackd supervisor.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. All types are serializable/deserializable via serde.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Name of the supervised worker binary (without platform extension).
///
/// Also used as the fallback `source` for log lines the worker emits
/// outside its structured format.
pub const WORKER_NAME: &str = "trackd";

/// Exact prefix of the line the worker prints once its Electrum RPC
/// server accepts connections. Must match the worker's startup banner.
pub const READY_MARKER: &str = "Electrum RPC server running";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A wallet's exported public key-derivation root (xpub or equivalent).
///
/// Identity of a [`KeyGroup`]: no two groups with the same root coexist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DerivationRoot(pub String);

impl fmt::Display for DerivationRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DerivationRoot {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DerivationRoot {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Rescan-start policy passed to the worker per key group
/// (e.g. `all`, `none`, a YYYY-MM-DD date, or a block height).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescanPolicy(pub String);

impl Default for RescanPolicy {
    fn default() -> Self {
        Self("all".to_owned())
    }
}

impl fmt::Display for RescanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RescanPolicy {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RescanPolicy {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bitcoin network the worker indexes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Regtest,
}

impl Network {
    /// Identifier the worker's `--network` flag expects.
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// Default local bitcoind RPC port for this network.
    pub fn default_rpc_port(self) -> u16 {
        match self {
            Network::Bitcoin => 8332,
            Network::Testnet => 18332,
            Network::Regtest => 18443,
        }
    }

    /// Map a host chain identifier onto a supported network.
    ///
    /// # Errors
    /// [`CoreError::UnsupportedNetwork`] for any chain the worker cannot
    /// serve; this aborts enabling the supervisor and is user-visible.
    pub fn from_chain(chain: &str) -> Result<Self, CoreError> {
        match chain.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Ok(Network::Bitcoin),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(CoreError::UnsupportedNetwork {
                chain: chain.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a classified worker log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lenient parse of the level token the worker prints, including the
    /// short forms its logger abbreviates to. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "TRCE" | "TRACE" | "DBG" | "DEBG" | "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WRN" | "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERR" | "ERRO" | "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One wallet's derivation root plus the rescan policy it should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGroup {
    pub root: DerivationRoot,
    pub rescan_since: RescanPolicy,
}

/// One classified line of worker output. Constructed per line, consumed
/// by the supervisor's event handler, not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub source: String,
    pub message: String,
}

/// Immutable snapshot fully determining one worker invocation.
///
/// Two snapshots with equal fields produce byte-identical argument
/// vectors; the ordered group map is what makes that hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub network: Network,
    pub bitcoind_url: String,
    pub bitcoind_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_cred: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_wallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Local port the worker's Electrum RPC server binds on 127.0.0.1.
    pub rpc_port: u16,
    pub verbosity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_options: Option<String>,
    #[serde(default)]
    pub groups: BTreeMap<DerivationRoot, KeyGroup>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
