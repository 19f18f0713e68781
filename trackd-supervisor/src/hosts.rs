//! Boundary traits for the host application's collaborators: the network
//! layer, the settings store, and loaded wallets. The supervisor never
//! reaches into the host directly; everything crosses these seams.

use serde::{Deserialize, Serialize};

use trackd_core::DerivationRoot;

/// Transport the host uses to reach an Electrum server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Ssl,
}

/// Connection parameters of the host's Electrum server selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerParams {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    /// When set the host treats this server as its sole upstream and
    /// disables multi-server selection.
    pub single_server: bool,
}

/// The host's network layer.
///
/// `apply` is invoked from the supervisor's log-draining task, not from
/// the host's own context. Implementations MUST marshal the call onto the
/// network layer's designated thread or executor if that layer is not
/// reentrant from arbitrary contexts; this is part of the contract, not
/// an optimization.
pub trait NetworkBackend: Send + Sync {
    /// Current connection parameters.
    fn parameters(&self) -> ServerParams;

    /// Replace the connection parameters.
    fn apply(&self, params: ServerParams);
}

/// The host's persistent settings, as far as the supervisor cares: the
/// live single-server flag plus one slot remembering the value it had
/// before the supervisor first overrode it.
pub trait SettingsStore {
    fn single_server(&self) -> bool;
    fn set_single_server(&mut self, value: bool);

    fn saved_single_server(&self) -> Option<bool>;
    /// `None` clears the slot.
    fn save_single_server(&mut self, value: Option<bool>);
}

/// A wallet loaded by the host, reduced to what membership needs.
pub trait WalletKeys {
    /// Wallet kind, for diagnostics on unsupported wallets.
    fn kind(&self) -> &str;

    /// Exportable public derivation roots; empty for wallet kinds that
    /// cannot be tracked (hardware-only stubs, imported-address wallets).
    fn master_public_keys(&self) -> Vec<DerivationRoot>;
}

/// Remember the host's single-server preference, once.
///
/// Called when the supervisor is enabled; a later enable while a value is
/// already saved leaves the slot alone so the pre-supervisor preference
/// survives repeated enable/disable cycles.
pub fn preserve_single_server(settings: &mut dyn SettingsStore) {
    if settings.saved_single_server().is_none() {
        let current = settings.single_server();
        settings.save_single_server(Some(current));
    }
}

/// Restore the preference saved by [`preserve_single_server`] and clear
/// the slot. No-op when nothing was saved.
pub fn restore_single_server(settings: &mut dyn SettingsStore) {
    if let Some(previous) = settings.saved_single_server() {
        settings.set_single_server(previous);
        settings.save_single_server(None);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// In-memory settings for membership/teardown tests.
    #[derive(Debug, Default)]
    pub struct MemorySettings {
        pub single_server: bool,
        pub saved: Option<bool>,
    }

    impl SettingsStore for MemorySettings {
        fn single_server(&self) -> bool {
            self.single_server
        }

        fn set_single_server(&mut self, value: bool) {
            self.single_server = value;
        }

        fn saved_single_server(&self) -> Option<bool> {
            self.saved
        }

        fn save_single_server(&mut self, value: Option<bool>) {
            self.saved = value;
        }
    }
}
