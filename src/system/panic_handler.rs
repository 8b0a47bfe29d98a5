//! Panic reporting
//!
//! Installs a process-wide panic hook that captures the payload, location
//! and backtrace, emits them through the log stream and appends them to
//! `crash.log` so a crash leaves a trace even when the log pipeline
//! itself is the casualty.

use std::fs::OpenOptions;
use std::io::Write;
use std::panic;

use chrono::Utc;
use tracing::error;

const CRASH_LOG: &str = "crash.log";

/// Install the custom panic hook. Call once during startup, after
/// logging is initialized.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "Unknown location".to_string());

        let backtrace = std::backtrace::Backtrace::force_capture();

        error!(%location, "Panic: {}", message);

        if let Err(e) = write_crash_log(&message, &location, &backtrace) {
            eprintln!("Failed to write crash log: {}", e);
        }
    }));
}

fn write_crash_log(
    message: &str,
    location: &str,
    backtrace: &std::backtrace::Backtrace,
) -> std::io::Result<()> {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let mut file = OpenOptions::new().create(true).append(true).open(CRASH_LOG)?;
    writeln!(file, "=== PANIC at {} ===", timestamp)?;
    writeln!(file, "Reason:   {}", message)?;
    writeln!(file, "Location: {}", location)?;
    writeln!(file, "Backtrace:\n{:?}", backtrace)?;
    writeln!(file)?;
    Ok(())
}
