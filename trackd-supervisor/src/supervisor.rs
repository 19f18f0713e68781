//! Worker process lifecycle: spawn, output draining, readiness handoff,
//! and termination. At most one worker is alive at any instant; a
//! monotonic generation counter keeps signals from a replaced process
//! from leaking into the current one.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use trackd_core::args::build_args;
use trackd_core::env::{self, Platform};
use trackd_core::logparse::classify;
use trackd_core::{KeyGroup, LogEvent, LogLevel, Network, READY_MARKER};

use crate::config::SupervisorConfig;
use crate::error::{io_err, SupervisorError};
use crate::hosts::{NetworkBackend, Transport};
use crate::membership::WorkerControl;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Lifecycle state; generations tag which worker instance it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running(u64),
    ReadyHandedOff(u64),
}

/// Handle on one live worker. Exclusively owned by the supervisor.
struct WorkerHandle {
    child: Child,
    rpc_port: u16,
    generation: u64,
    /// Ends on its own when the worker's pipes close.
    _drain: JoinHandle<()>,
}

/// State reachable from the log-draining task. The drain task only reads
/// the generation and flips `Running -> ReadyHandedOff`; all other
/// mutation happens from the host's control-flow context.
struct Shared {
    generation: AtomicU64,
    state: Mutex<SupervisorState>,
    network: Arc<dyn NetworkBackend>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one classified event from the worker of `generation`.
    ///
    /// Events from a superseded generation are discarded; the readiness
    /// handoff fires at most once per generation.
    fn on_event(&self, generation: u64, rpc_port: u16, event: &LogEvent) {
        if generation != self.generation.load(Ordering::SeqCst) {
            return;
        }

        match event.level {
            LogLevel::Error => {
                tracing::error!(source = %event.source, "{}", event.message);
            }
            LogLevel::Warn => {
                tracing::warn!(source = %event.source, "{}", event.message);
            }
            _ => {}
        }

        if !event.message.starts_with(READY_MARKER) {
            return;
        }

        {
            let mut state = self.lock_state();
            match *state {
                SupervisorState::Running(g) if g == generation => {
                    *state = SupervisorState::ReadyHandedOff(generation);
                }
                // Already handed off, or the worker was stopped while the
                // banner was in flight.
                _ => return,
            }
        }

        tracing::info!(generation, port = rpc_port, "worker ready, switching host to local server");
        let mut params = self.network.parameters();
        params.host = "127.0.0.1".to_owned();
        params.port = rpc_port;
        params.transport = Transport::Tcp;
        params.single_server = true;
        self.network.apply(params);
    }

    /// The worker's output stream ended.
    ///
    /// Normal after `stop`/`restart`; anything else means the process
    /// died on its own. No auto-restart: the host recovers via the next
    /// membership change or an explicit restart.
    fn on_stream_closed(&self, generation: u64) {
        if generation != self.generation.load(Ordering::SeqCst) {
            return;
        }
        let state = *self.lock_state();
        if state != SupervisorState::Stopped {
            tracing::warn!(
                generation,
                ?state,
                "worker exited unexpectedly; waiting for membership change or restart",
            );
        }
    }
}

/// Owns the worker process and drives its lifecycle.
///
/// `start`, `stop`, and `restart` must be called from within a tokio
/// runtime and from a single control-flow context; they block only on
/// process spawn/terminate syscalls. Failures are logged and observable
/// via [`Supervisor::state`], never returned to the caller.
pub struct Supervisor {
    config: SupervisorConfig,
    network_id: Network,
    groups: BTreeMap<trackd_core::DerivationRoot, KeyGroup>,
    shared: Arc<Shared>,
    handle: Option<WorkerHandle>,
}

impl Supervisor {
    /// Resolve the host chain and build a stopped supervisor.
    ///
    /// # Errors
    /// [`SupervisorError::Core`] with `UnsupportedNetwork` when the host
    /// runs on a chain the worker cannot serve; enabling aborts.
    pub fn new(
        config: SupervisorConfig,
        network: Arc<dyn NetworkBackend>,
    ) -> Result<Self, SupervisorError> {
        let network_id = Network::from_chain(&config.chain)?;
        Ok(Self {
            config,
            network_id,
            groups: BTreeMap::new(),
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                state: Mutex::new(SupervisorState::Stopped),
                network,
            }),
            handle: None,
        })
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.lock_state()
    }

    /// Local RPC port of the live worker, if any.
    pub fn rpc_port(&self) -> Option<u16> {
        self.handle.as_ref().map(|handle| handle.rpc_port)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Update the configuration and restart the worker under it.
    pub fn reconfigure(&mut self, config: SupervisorConfig) {
        self.config = config;
        self.restart();
    }

    /// Launch the worker. No-op when disabled or when no key groups are
    /// registered; there is nothing to serve.
    pub fn start(&mut self) {
        if !self.config.enabled || self.groups.is_empty() {
            return;
        }

        // Full stop first: never two live workers.
        self.stop();

        if let Err(err) = self.launch() {
            tracing::error!(error = %err, "failed to start worker");
            *self.shared.lock_state() = SupervisorState::Stopped;
        }
    }

    /// Request graceful termination and drop the handle. Idempotent; does
    /// not wait for the process to exit, so termination may still be in
    /// flight on return. The drain task ends when the pipes close.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::info!(generation = handle.generation, "stopping worker");
            let mut child = handle.child;
            terminate(&mut child);
            // Reap the child off the control path.
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
        }
        *self.shared.lock_state() = SupervisorState::Stopped;
    }

    /// `stop` then `start`. Invoked on membership or configuration
    /// change, never unconditionally.
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    fn launch(&mut self) -> Result<(), SupervisorError> {
        let platform = Platform::current();
        let rpc_port = env::free_port().map_err(|e| io_err("rpc port allocation", e))?;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.shared.lock_state() = SupervisorState::Starting;

        let snapshot = self.config.snapshot(self.network_id, rpc_port, &self.groups)?;
        let args = build_args(&snapshot);
        tracing::info!(generation, port = rpc_port, "starting worker");
        tracing::debug!(options = %args.join(" "), "worker options");

        let program = env::worker_binary(platform, &self.config.plugin_dir);
        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command
            .spawn()
            .map_err(|source| SupervisorError::Spawn { program, source })?;

        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child);
            return Err(SupervisorError::Pipe("stdout"));
        };
        let Some(stderr) = child.stderr.take() else {
            terminate(&mut child);
            return Err(SupervisorError::Pipe("stderr"));
        };

        // The worker may print its banner immediately; the state must be
        // Running before the drain task can observe it, or the one-shot
        // handoff for this generation is lost.
        *self.shared.lock_state() = SupervisorState::Running(generation);
        let drain = tokio::spawn(drain_worker_output(
            stdout,
            stderr,
            Arc::clone(&self.shared),
            generation,
            rpc_port,
        ));

        self.handle = Some(WorkerHandle {
            child,
            rpc_port,
            generation,
            _drain: drain,
        });
        Ok(())
    }
}

impl WorkerControl for Supervisor {
    fn restart_with(&mut self, groups: Vec<KeyGroup>) {
        self.groups = groups
            .into_iter()
            .map(|group| (group.root.clone(), group))
            .collect();
        self.restart();
    }

    fn stop(&mut self) {
        Supervisor::stop(self);
    }
}

/// Drain the worker's stdout and stderr as one logical stream.
///
/// Every line is mirrored verbatim at debug level before classification.
/// Ends when both pipes close (normally process exit); an undecodable
/// line ends attribution for this generation without touching the
/// process.
async fn drain_worker_output<O, E>(
    stdout: O,
    stderr: E,
    shared: Arc<Shared>,
    generation: u64,
    rpc_port: u16,
) where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout).lines();
    let mut err = BufReader::new(stderr).lines();
    let mut out_open = true;
    let mut err_open = true;

    loop {
        let line = tokio::select! {
            res = out.next_line(), if out_open => match res {
                Ok(Some(line)) => line,
                Ok(None) => {
                    out_open = false;
                    continue;
                }
                Err(error) => {
                    tracing::error!(generation, error = %error, "worker output not decodable; log parsing stopped");
                    return;
                }
            },
            res = err.next_line(), if err_open => match res {
                Ok(Some(line)) => line,
                Ok(None) => {
                    err_open = false;
                    continue;
                }
                Err(error) => {
                    tracing::error!(generation, error = %error, "worker output not decodable; log parsing stopped");
                    return;
                }
            },
            else => break,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tracing::debug!(target: "trackd::worker", "{line}");
        shared.on_event(generation, rpc_port, &classify(line));
    }

    shared.on_stream_closed(generation);
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let _ = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}
