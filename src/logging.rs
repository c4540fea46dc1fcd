use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOG_FILE_NAME: &str = "log.txt";

// Appends one timestamped line per record to a single file.
#[derive(Debug)]
struct FileLogger {
    log_file: PathBuf,
}

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let log_entry = format!(
            "{} {} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        );
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
        {
            let _ = file.write_all(log_entry.as_bytes());
        }
    }

    fn flush(&self) {}
}

pub fn level_for(debug_mode: bool) -> LevelFilter {
    if debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Route the `log` macros to `<log_dir>/log.txt`.
///
/// Only the first call installs a logger; later calls only adjust the level.
pub fn init(log_dir: &Path, debug_mode: bool) -> Result<(), SetLoggerError> {
    let level = level_for(debug_mode);
    // A missing directory just means records are dropped.
    let _ = create_dir_all(log_dir);

    let mut installed = false;
    let logger = LOGGER.get_or_init(|| {
        installed = true;
        FileLogger {
            log_file: log_dir.join(LOG_FILE_NAME),
        }
    });
    if installed {
        log::set_logger(logger)?;
    }
    log::set_max_level(level);
    Ok(())
}

/// Follow a change of the debug setting at runtime.
pub fn set_debug(debug_mode: bool) {
    log::set_max_level(level_for(debug_mode));
}
