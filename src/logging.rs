use std::path::{Path, PathBuf};

pub const LOG_FILE_BASENAME: &str = "imanes-tasks";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV_VAR: &str = "IMANES_TASKS_LOG";

/// Log files live next to the stored data, in their own subdirectory so they
/// never show up as store entries.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Picks the log spec: the crate variable, then `RUST_LOG`, then the build default.
pub fn resolve_log_spec(crate_var: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,imanes_tasks=debug"
    } else {
        "warn,imanes_tasks=info"
    };
    crate_var
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Builds, without installing, the rotating file logger for a data directory.
/// The log directory is created on the way.
#[cfg(feature = "file-log")]
pub fn file_logger(
    data_dir: &Path,
    spec: &str,
) -> Result<flexi_logger::Logger, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{opt_format, Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};

    let directory = log_directory(data_dir);
    std::fs::create_dir_all(&directory)?;

    let echo = if cfg!(debug_assertions) {
        Duplicate::Warn
    } else {
        Duplicate::None
    };
    Ok(Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .append()
        .format_for_files(opt_format)
        .rotate(
            Criterion::AgeOrSize(Age::Day, LOG_ROTATE_SIZE_BYTES),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(echo))
}

/// Installs the file logger as the process-wide `log` backend. Keep the
/// returned handle alive for as long as records should reach the file.
#[cfg(feature = "file-log")]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    let spec = resolve_log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let handle = file_logger(data_dir, &spec)?.start()?;
    log::info!(
        "file logging started dir={} spec={spec}",
        log_directory(data_dir).display()
    );
    Ok(handle)
}
