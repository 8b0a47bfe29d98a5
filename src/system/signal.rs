//! OS signal subscription
//!
//! Signal subscriptions are held in an explicit registry instead of
//! ambient global listener state, with the lifecycle install -> active ->
//! consumed. Each listener fires for its own signal at most once, then
//! the listener task ends. `uninstall` lets tests reset between runs.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::{MicrobaseError, Result};
use crate::runtime::lifetime::shutdown::ShutdownSignalKind;

/// Owns the spawned one-shot signal listener tasks.
#[derive(Default)]
pub struct SignalRegistry {
    listeners: Vec<JoinHandle<()>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a one-shot handler to `kind`.
    ///
    /// The OS-level subscription is created synchronously so the handler
    /// is active by the time this returns; the wait itself runs on a
    /// spawned task. After the first delivery the handler runs once and
    /// the subscription is consumed.
    #[cfg(unix)]
    pub fn watch<F, Fut>(&mut self, kind: ShutdownSignalKind, on_signal: F) -> Result<()>
    where
        F: FnOnce(ShutdownSignalKind) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut stream = tokio::signal::unix::signal(kind.signal_kind()).map_err(|e| {
            MicrobaseError::signal_operation(format!("Failed to subscribe to {}: {}", kind, e))
        })?;
        self.listeners.push(tokio::spawn(async move {
            if stream.recv().await.is_some() {
                debug!(signal = %kind, "Signal listener consumed");
                on_signal(kind).await;
            }
        }));
        Ok(())
    }

    /// Non-unix platforms only deliver ctrl-c; every configured signal
    /// kind degrades to that.
    #[cfg(not(unix))]
    pub fn watch<F, Fut>(&mut self, kind: ShutdownSignalKind, on_signal: F) -> Result<()>
    where
        F: FnOnce(ShutdownSignalKind) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.listeners.push(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!(signal = %kind, "Signal listener consumed");
                on_signal(kind).await;
            }
        }));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Abort listeners that have not fired yet.
    pub fn uninstall(&mut self) {
        for handle in self.listeners.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for SignalRegistry {
    fn drop(&mut self) {
        self.uninstall();
    }
}
