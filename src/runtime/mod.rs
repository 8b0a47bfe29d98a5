//! Application lifecycle: teardown hooks, the shutdown coordinator and
//! the server run mode.

pub mod lifetime;
pub mod modes;

pub use lifetime::hooks::ShutdownHooks;
pub use lifetime::shutdown::{
    ExitFn, SessionOutcome, ShutdownConfig, ShutdownCoordinator, ShutdownSignalKind,
};
pub use modes::server::{ServerOptions, run_server};
