//! Tracks which wallets' key groups the worker should serve, and turns
//! actual membership changes into worker restarts.

use std::collections::BTreeMap;

use trackd_core::{DerivationRoot, KeyGroup, RescanPolicy};

use crate::hosts::{restore_single_server, SettingsStore, WalletKeys};

/// Seam between membership tracking and the process supervisor. Lets the
/// tracker be tested without spawning anything.
pub trait WorkerControl {
    /// Replace the active key-group set and restart the worker under it.
    fn restart_with(&mut self, groups: Vec<KeyGroup>);

    /// Stop the worker.
    fn stop(&mut self);
}

/// Owns the set of active key groups, keyed by derivation root. Restarts
/// the worker only when membership actually changed.
pub struct MembershipTracker<C> {
    control: C,
    groups: BTreeMap<DerivationRoot, KeyGroup>,
    rescan_since: RescanPolicy,
}

impl<C: WorkerControl> MembershipTracker<C> {
    pub fn new(control: C, rescan_since: RescanPolicy) -> Self {
        Self {
            control,
            groups: BTreeMap::new(),
            rescan_since,
        }
    }

    pub fn control_mut(&mut self) -> &mut C {
        &mut self.control
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Host notification: a wallet was loaded.
    ///
    /// Wallets without exportable derivation roots are logged and skipped
    /// without touching the set. Re-adding roots already present is a
    /// no-op; only genuinely new roots trigger a restart.
    pub fn wallet_loaded(&mut self, wallet: &dyn WalletKeys) {
        let roots = wallet.master_public_keys();
        if roots.is_empty() {
            tracing::warn!(kind = wallet.kind(), "unsupported wallet, skipping");
            return;
        }

        let mut added = false;
        for root in roots {
            if !self.groups.contains_key(&root) {
                self.groups.insert(
                    root.clone(),
                    KeyGroup {
                        root,
                        rescan_since: self.rescan_since.clone(),
                    },
                );
                added = true;
            }
        }

        if added {
            self.control.restart_with(self.groups.values().cloned().collect());
        }
    }

    /// Host notification: a wallet was unloaded.
    ///
    /// An empty set means nothing to serve, so the worker is stopped
    /// rather than restarted with zero groups.
    pub fn wallet_unloaded(&mut self, wallet: &dyn WalletKeys) {
        for root in wallet.master_public_keys() {
            self.groups.remove(&root);
        }
        if self.groups.is_empty() {
            self.control.stop();
        }
    }

    /// Host notification: the plugin is being torn down. Stops the worker
    /// and restores the host's pre-supervisor single-server preference.
    pub fn teardown(&mut self, settings: &mut dyn SettingsStore) {
        self.control.stop();
        restore_single_server(settings);
    }
}
