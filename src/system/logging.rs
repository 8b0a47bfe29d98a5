//! Logging system initialization
//!
//! Sets up the tracing subscriber from application configuration: level
//! filtering, pretty or JSON output, optional file target with daily
//! rotation, and redaction of secret environment values from every line
//! before it reaches the sink.

use std::io::Write;

use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Environment variables whose values are always redacted, on top of
/// whatever `logging.redact_env` names.
const BUILTIN_REDACTED_ENV: &[&str] = &["LOG_FINGERPRINT_SALT"];

/// Writer wrapper that replaces known secret values with `[secure]`.
///
/// Operates per write call; the fmt layer hands over whole lines, so a
/// secret never straddles two writes.
pub struct RedactingWriter<W: Write> {
    inner: W,
    secrets: Vec<String>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, secrets: Vec<String>) -> Self {
        Self { inner, secrets }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut line = String::from_utf8_lossy(buf).into_owned();
        for secret in &self.secrets {
            if line.contains(secret.as_str()) {
                line = line.replace(secret.as_str(), "[secure]");
            }
        }
        self.inner.write_all(line.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Collect the secret values to scrub from log output.
///
/// Unset or empty variables contribute nothing. Values shorter than four
/// characters are skipped: redacting them would mangle ordinary text.
pub fn build_redaction_list(config: &AppConfig) -> Vec<String> {
    BUILTIN_REDACTED_ENV
        .iter()
        .copied()
        .map(str::to_string)
        .chain(config.logging.redact_env.iter().cloned())
        .filter_map(|name| std::env::var(&name).ok())
        .filter(|value| value.len() >= 4)
        .collect()
}

/// Initialize logging system based on configuration
///
/// **Note**: This should be called only once during application startup,
/// after the configuration has been loaded.
///
/// # Returns
/// * `WorkerGuard` - Must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
///
/// # Panics
/// * If creating the log appender fails
/// * If setting the global subscriber fails (e.g., already initialized)
pub fn init_logging(config: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let writer: Box<dyn Write + Send + Sync> = if let Some(ref log_file) = config.logging.file {
        if !log_file.is_empty() && config.logging.enable_rotation {
            let dir = std::path::Path::new(log_file)
                .parent()
                .unwrap_or(std::path::Path::new("."));
            let filename = std::path::Path::new(log_file)
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("microbase.log"));
            let filename_str = filename.to_str().unwrap_or("microbase.log");
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix(filename_str.trim_end_matches(".log"))
                .filename_suffix("log")
                .max_log_files(config.logging.max_backups as usize)
                .build(dir)
                .expect("Failed to create rolling log appender");
            Box::new(appender)
        } else if !log_file.is_empty() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .expect("Failed to open log file");
            Box::new(file)
        } else {
            Box::new(std::io::stdout())
        }
    } else {
        Box::new(std::io::stdout())
    };

    let secrets = build_redaction_list(config);
    let writer: Box<dyn Write + Send + Sync> = if secrets.is_empty() {
        writer
    } else {
        Box::new(RedactingWriter::new(writer, secrets))
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(config.logging.file.as_ref().is_none_or(|f| f.is_empty()));

    if config.logging.format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacting_writer_scrubs_secret_values() {
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::new(&mut sink, vec!["hunter22".to_string()]);
            writer
                .write_all(b"connecting with token hunter22 to upstream\n")
                .unwrap();
        }
        let output = String::from_utf8(sink).unwrap();
        assert_eq!(output, "connecting with token [secure] to upstream\n");
    }

    #[test]
    fn redacting_writer_reports_original_length() {
        let mut sink = Vec::new();
        let mut writer = RedactingWriter::new(&mut sink, vec!["secret-value".to_string()]);
        let buf = b"secret-value";
        assert_eq!(writer.write(buf).unwrap(), buf.len());
    }

    #[test]
    fn short_env_values_are_not_redacted() {
        let mut config = AppConfig::default();
        config.logging.redact_env = vec!["MICROBASE_TEST_SHORT_SECRET".to_string()];
        unsafe { std::env::set_var("MICROBASE_TEST_SHORT_SECRET", "ab") };
        let secrets = build_redaction_list(&config);
        assert!(!secrets.iter().any(|s| s == "ab"));
        unsafe { std::env::remove_var("MICROBASE_TEST_SHORT_SECRET") };
    }
}
