//! Argument vector construction for one worker invocation.

use crate::types::WorkerConfig;

/// Build the worker's command-line arguments from an invocation snapshot.
///
/// Deterministic: equal snapshots yield byte-identical vectors. Each flag
/// and its value are adjacent; the worker accepts flags in any relative
/// order.
pub fn build_args(config: &WorkerConfig) -> Vec<String> {
    let mut args = vec![
        "--network".to_owned(),
        config.network.as_str().to_owned(),
        "--bitcoind-url".to_owned(),
        config.bitcoind_url.clone(),
        "--bitcoind-dir".to_owned(),
        config.bitcoind_dir.display().to_string(),
        "--electrum-rpc-addr".to_owned(),
        format!("127.0.0.1:{}", config.rpc_port),
    ];

    if let Some(cred) = &config.bitcoind_cred {
        args.push("--bitcoind-cred".to_owned());
        args.push(cred.clone());
    }

    if let Some(wallet) = &config.bitcoind_wallet {
        args.push("--bitcoind-wallet".to_owned());
        args.push(wallet.clone());
    }

    if let Some(socket) = &config.socket_path {
        args.push("--unix-listener-path".to_owned());
        args.push(socket.display().to_string());
    }

    for group in config.groups.values() {
        args.push("--xpub".to_owned());
        args.push(format!("{}:{}", group.root, group.rescan_since));
    }

    for _ in 0..config.verbosity {
        args.push("-v".to_owned());
    }

    if let Some(custom) = &config.custom_options {
        // Split on single spaces only; options with embedded spaces cannot
        // be expressed here. The worker has none, so this stays.
        args.extend(custom.split(' ').map(str::to_owned));
    }

    args
}
