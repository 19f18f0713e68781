//! Lifecycle tests against a stub worker: a shell script standing in for
//! the real binary, emitting (or not) the readiness banner.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use trackd_core::{KeyGroup, READY_MARKER};
use trackd_supervisor::hosts::{NetworkBackend, ServerParams, Transport};
use trackd_supervisor::{Supervisor, SupervisorConfig, SupervisorState, WorkerControl};

#[derive(Default)]
struct RecordingNetwork {
    applied: Mutex<Vec<ServerParams>>,
}

impl NetworkBackend for RecordingNetwork {
    fn parameters(&self) -> ServerParams {
        ServerParams {
            host: "remote.example".to_owned(),
            port: 50002,
            transport: Transport::Ssl,
            single_server: false,
        }
    }

    fn apply(&self, params: ServerParams) {
        self.applied.lock().expect("lock").push(params);
    }
}

/// Install `script` as the worker binary inside `plugin_dir`.
fn install_stub_worker(plugin_dir: &Path, script: &str) {
    let bin = plugin_dir.join("trackd");
    fs::write(&bin, script).expect("write stub worker");
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).expect("chmod stub worker");
}

fn enabled_supervisor(plugin_dir: &Path, network: Arc<RecordingNetwork>) -> Supervisor {
    let mut config = SupervisorConfig::new("regtest", plugin_dir);
    config.enabled = true;
    config.bitcoind_dir = Some(plugin_dir.to_path_buf());
    Supervisor::new(config, network).expect("supervisor")
}

fn group(root: &str) -> KeyGroup {
    KeyGroup {
        root: root.into(),
        rescan_since: "all".into(),
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn readiness_banner_hands_off_to_local_server() {
    let dir = TempDir::new().expect("tempdir");
    install_stub_worker(
        dir.path(),
        &format!("#!/bin/sh\necho \"{READY_MARKER} on 127.0.0.1:0\"\nsleep 30\n"),
    );

    let network = Arc::new(RecordingNetwork::default());
    let mut supervisor = enabled_supervisor(dir.path(), network.clone());
    supervisor.restart_with(vec![group("xpubA")]);
    assert_eq!(supervisor.state(), SupervisorState::Running(1));
    let port = supervisor.rpc_port().expect("live worker has a port");

    let handed_off = wait_for(|| !network.applied.lock().expect("lock").is_empty()).await;
    assert!(handed_off, "readiness banner should reach the network backend");

    let applied = network.applied.lock().expect("lock");
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].host, "127.0.0.1");
    assert_eq!(applied[0].port, port);
    assert_eq!(applied[0].transport, Transport::Tcp);
    assert!(applied[0].single_server);
    drop(applied);

    assert_eq!(supervisor.state(), SupervisorState::ReadyHandedOff(1));

    supervisor.stop();
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

// On a multi-threaded runtime the drain task runs as soon as it is
// spawned, so a banner the worker printed at exec time can be classified
// while start() is still returning. It must land in Running state, not a
// startup window that would drop the generation's only handoff.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn immediate_banner_is_not_lost_to_startup_ordering() {
    let dir = TempDir::new().expect("tempdir");
    install_stub_worker(
        dir.path(),
        &format!("#!/bin/sh\necho \"{READY_MARKER}\"\nsleep 30\n"),
    );

    let network = Arc::new(RecordingNetwork::default());
    let mut supervisor = enabled_supervisor(dir.path(), network.clone());
    supervisor.restart_with(vec![group("xpubA")]);

    let handed_off = wait_for(|| !network.applied.lock().expect("lock").is_empty()).await;
    assert!(handed_off, "banner printed at exec time must still hand off");
    assert_eq!(supervisor.state(), SupervisorState::ReadyHandedOff(1));

    supervisor.stop();
}

#[tokio::test]
async fn restart_discards_stale_readiness() {
    let dir = TempDir::new().expect("tempdir");
    // First generation sits on the banner long enough for the restart to
    // supersede it.
    install_stub_worker(
        dir.path(),
        &format!("#!/bin/sh\nsleep 1\necho \"{READY_MARKER}\"\nsleep 30\n"),
    );

    let network = Arc::new(RecordingNetwork::default());
    let mut supervisor = enabled_supervisor(dir.path(), network.clone());
    supervisor.restart_with(vec![group("xpubA")]);
    supervisor.restart_with(vec![group("xpubA"), group("xpubB")]);
    assert_eq!(supervisor.state(), SupervisorState::Running(2));
    let port = supervisor.rpc_port().expect("live worker has a port");

    let handed_off = wait_for(|| !network.applied.lock().expect("lock").is_empty()).await;
    assert!(handed_off);

    // Only generation 2 may hand off, with its own port.
    let applied = network.applied.lock().expect("lock");
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].port, port);
    drop(applied);
    assert_eq!(supervisor.state(), SupervisorState::ReadyHandedOff(2));

    supervisor.stop();
}

#[tokio::test]
async fn worker_crash_is_not_auto_restarted() {
    let dir = TempDir::new().expect("tempdir");
    install_stub_worker(dir.path(), "#!/bin/sh\necho \"warming up\"\nexit 1\n");

    let network = Arc::new(RecordingNetwork::default());
    let mut supervisor = enabled_supervisor(dir.path(), network.clone());
    supervisor.restart_with(vec![group("xpubA")]);
    assert_eq!(supervisor.state(), SupervisorState::Running(1));

    // Give the process time to die; the supervisor leaves state as-is.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(supervisor.state(), SupervisorState::Running(1));
    assert!(network.applied.lock().expect("lock").is_empty());

    supervisor.stop();
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}
