//! Configuration surface the host exposes to the supervisor, and its
//! resolution into per-invocation snapshots.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use trackd_core::env::{self, Platform};
use trackd_core::{DerivationRoot, KeyGroup, Network, RescanPolicy, WorkerConfig};

use crate::error::SupervisorError;

/// Host-owned configuration read by the supervisor. Unset options fall
/// back to platform defaults at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub enabled: bool,
    /// Host chain identifier, resolved via [`Network::from_chain`].
    pub chain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_cred: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitcoind_wallet: Option<String>,
    #[serde(default)]
    pub rescan_since: RescanPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_options: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    #[serde(default)]
    pub verbosity: u8,
    /// Directory the plugin (and the worker binary) is installed in.
    pub plugin_dir: PathBuf,
}

impl SupervisorConfig {
    /// Disabled configuration with all options at their defaults.
    pub fn new(chain: impl Into<String>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: false,
            chain: chain.into(),
            bitcoind_url: None,
            bitcoind_dir: None,
            bitcoind_cred: None,
            bitcoind_wallet: None,
            rescan_since: RescanPolicy::default(),
            custom_options: None,
            socket_path: None,
            verbosity: 0,
            plugin_dir: plugin_dir.into(),
        }
    }

    /// Freeze this configuration into the snapshot for one invocation.
    ///
    /// # Errors
    /// [`SupervisorError::HomeNotFound`] when no `bitcoind_dir` is set and
    /// the platform default cannot be resolved.
    pub fn snapshot(
        &self,
        network: Network,
        rpc_port: u16,
        groups: &BTreeMap<DerivationRoot, KeyGroup>,
    ) -> Result<WorkerConfig, SupervisorError> {
        let platform = Platform::current();

        let bitcoind_dir = match &self.bitcoind_dir {
            Some(dir) => dir.clone(),
            None => env::default_bitcoind_dir(platform).ok_or(SupervisorError::HomeNotFound)?,
        };

        Ok(WorkerConfig {
            network,
            bitcoind_url: self
                .bitcoind_url
                .clone()
                .unwrap_or_else(|| env::default_bitcoind_url(network)),
            bitcoind_dir,
            bitcoind_cred: self.bitcoind_cred.clone(),
            bitcoind_wallet: self.bitcoind_wallet.clone(),
            socket_path: self
                .socket_path
                .clone()
                .or_else(|| env::default_socket_path(platform, &self.plugin_dir)),
            rpc_port,
            verbosity: self.verbosity,
            custom_options: self.custom_options.clone(),
            groups: groups.clone(),
        })
    }
}
