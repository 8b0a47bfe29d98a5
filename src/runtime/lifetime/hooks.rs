//! Teardown hook registry
//!
//! The host's aggregated cleanup sequence. Callers register named async
//! hooks (close a connection pool, flush buffered writes, remove a
//! lockfile) and the shutdown coordinator awaits the whole sequence as a
//! single teardown future.
//!
//! Hooks run sequentially in registration order. The first error aborts
//! the remainder and becomes the teardown error; ordering among
//! independent cleanup actions is the caller's responsibility.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::debug;

type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type HookFn = Box<dyn Fn() -> HookFuture + Send + Sync>;

struct NamedHook {
    name: String,
    action: HookFn,
}

/// Registry of named cleanup actions, drained on first run.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<NamedHook>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup action under `name`. The name shows up in logs
    /// and in the error chain when the hook fails.
    pub fn on_close<F, Fut>(&self, name: &str, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.hooks.lock().push(NamedHook {
            name: name.to_string(),
            action: Box::new(move || Box::pin(action())),
        });
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }

    /// Run all registered hooks in registration order, awaiting each.
    ///
    /// Hooks are drained before running, so the sequence executes at most
    /// once; a second call is a no-op returning `Ok`.
    pub async fn run_all(&self) -> anyhow::Result<()> {
        let hooks: Vec<NamedHook> = {
            let mut guard = self.hooks.lock();
            guard.drain(..).collect()
        };
        for hook in hooks {
            let started = Instant::now();
            (hook.action)()
                .await
                .with_context(|| format!("onClose hook '{}' failed", hook.name))?;
            debug!(
                hook = %hook.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Close hook completed"
            );
        }
        Ok(())
    }
}
