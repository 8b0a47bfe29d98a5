//! Platform and process-level utilities: logging, signal subscription
//! and panic reporting.

pub mod logging;
pub mod panic_handler;
pub mod signal;

pub use logging::init_logging;
pub use panic_handler::install_panic_hook;
pub use signal::SignalRegistry;
