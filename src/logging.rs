//! Logging bootstrap
//!
//! `log` facade backed by flexi_logger. Output goes to stderr, and to a
//! rotating file as well when a log directory is configured. Initialization
//! happens at most once per process; later calls are no-ops.

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;
use std::path::Path;

use crate::errors::{BootError, Result};

const LOG_FILE_BASENAME: &str = "wasmboot";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Map CLI verbosity flags onto a log level, overriding the configured one
pub fn effective_level(configured: &str, verbose: u8, quiet: bool) -> &str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

/// Start logging at `level`, optionally also writing into `log_dir`
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<()> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let logger = Logger::try_with_str(level)
        .map_err(|e| BootError::ConfigError(format!("invalid log level `{}`: {}", level, e)))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .duplicate_to_stderr(Duplicate::All)
                .format_for_files(flexi_logger::detailed_format)
                .write_mode(WriteMode::BufferAndFlush)
                .append()
        }
        None => logger.log_to_stderr(),
    };

    let handle = logger
        .start()
        .map_err(|e| BootError::Generic(format!("failed to start logger: {}", e)))?;

    // Another thread may have won the race; its handle stays active
    let _ = LOGGER.set(handle);
    log::debug!("logging initialized at level {}", level);
    Ok(())
}

/// Write out buffered file output; call before the process exits
pub fn flush() {
    if let Some(handle) = LOGGER.get() {
        handle.flush();
    }
}
