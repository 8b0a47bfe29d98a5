//! Graceful shutdown coordinator
//!
//! On receipt of a configured termination signal, runs the host teardown
//! sequence exactly once, races it against a hard deadline and terminates
//! the process with a deterministic exit code:
//!
//! - `0`    teardown finished before the deadline
//! - `1`    teardown returned an error before the deadline
//! - `hard_exit_code` (default `1`)  teardown exceeded the deadline and
//!   was abandoned mid-flight
//!
//! The process-terminate primitive is injected as a capability so tests
//! can substitute a recording stub instead of killing the test runner.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::system::signal::SignalRegistry;

/// Process-terminate capability. Production code wraps
/// `std::process::exit`; tests record the exit code instead.
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync>;

/// Immutable shutdown configuration, supplied once at startup.
#[derive(Clone, Debug)]
pub struct ShutdownConfig {
    pub signals: Vec<ShutdownSignalKind>,
    /// Grace period for the teardown sequence before hard-exiting
    pub timeout: Duration,
    /// Exit code used when hard-exiting after the timeout
    pub hard_exit_code: i32,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            signals: vec![ShutdownSignalKind::Interrupt, ShutdownSignalKind::Terminate],
            timeout: Duration::from_millis(10_000),
            hard_exit_code: 1,
        }
    }
}

/// Termination signals the coordinator can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignalKind {
    Interrupt,
    Terminate,
    Quit,
    Hangup,
}

impl ShutdownSignalKind {
    #[cfg(unix)]
    pub(crate) fn signal_kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Quit => SignalKind::quit(),
            Self::Hangup => SignalKind::hangup(),
        }
    }
}

impl std::fmt::Display for ShutdownSignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Quit => write!(f, "SIGQUIT"),
            Self::Hangup => write!(f, "SIGHUP"),
        }
    }
}

impl std::str::FromStr for ShutdownSignalKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SIGINT" | "INT" | "INTERRUPT" => Ok(Self::Interrupt),
            "SIGTERM" | "TERM" | "TERMINATE" => Ok(Self::Terminate),
            "SIGQUIT" | "QUIT" => Ok(Self::Quit),
            "SIGHUP" | "HUP" | "HANGUP" => Ok(Self::Hangup),
            _ => Err(format!(
                "Unknown shutdown signal: '{}'. Valid: SIGINT, SIGTERM, SIGQUIT, SIGHUP",
                s
            )),
        }
    }
}

/// Outcome of one shutdown session. Exactly one session runs per process;
/// every outcome is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed,
    TimedOut,
}

pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    exit: ExitFn,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self::with_exit(config, Arc::new(|code| std::process::exit(code)))
    }

    /// Construct with an injected process-terminate capability.
    pub fn with_exit(config: ShutdownConfig, exit: ExitFn) -> Self {
        Self { config, exit }
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// Run one shutdown session for `signal`.
    ///
    /// The teardown future and the deadline timer run concurrently;
    /// whichever settles first governs the outcome. The timer is
    /// authoritative on timeout (the still-running teardown is dropped and
    /// never observed again), teardown is authoritative otherwise (the
    /// timer is dropped, so no late hard-exit can fire). No log lines are
    /// emitted after the exit capability has been invoked.
    pub async fn run<F>(&self, signal: ShutdownSignalKind, teardown: F) -> SessionOutcome
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let started = Instant::now();
        info!(signal = %signal, "Received signal");

        tokio::select! {
            biased;
            result = teardown => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match result {
                    Ok(()) => {
                        info!(signal = %signal, elapsed_ms, "Process terminated");
                        (self.exit)(0);
                        SessionOutcome::Completed
                    }
                    Err(e) => {
                        error!(
                            signal = %signal,
                            elapsed_ms,
                            error = %format!("{:#}", e),
                            "Process terminated with error during teardown"
                        );
                        (self.exit)(1);
                        SessionOutcome::Failed
                    }
                }
            }
            _ = sleep(self.config.timeout) => {
                error!(
                    signal = %signal,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Hard-exiting the process after timeout"
                );
                (self.exit)(self.config.hard_exit_code);
                SessionOutcome::TimedOut
            }
        }
    }

    /// Register one one-shot listener per configured signal.
    ///
    /// Each listener consumes its own signal once and triggers a shutdown
    /// session with a fresh teardown future built by `teardown`. Dropping
    /// or uninstalling the returned registry deactivates listeners that
    /// have not fired yet.
    ///
    /// Installing twice with overlapping signals produces overlapping
    /// listeners with unspecified precedence; callers are expected to
    /// install once.
    pub fn install<F, Fut>(self: &Arc<Self>, teardown: F) -> SignalRegistry
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut registry = SignalRegistry::new();
        for kind in self.config.signals.clone() {
            let coordinator = Arc::clone(self);
            let teardown = teardown.clone();
            if let Err(e) = registry.watch(kind, move |signal| {
                let coordinator = Arc::clone(&coordinator);
                let teardown = teardown.clone();
                async move {
                    coordinator.run(signal, teardown()).await;
                }
            }) {
                warn!(signal = %kind, "Failed to subscribe to signal: {}", e);
            }
        }
        registry
    }
}
