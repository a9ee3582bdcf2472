//! Logger setup for hosts that do not install their own `log` backend.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{ColorChoice, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger};

pub enum LogDestination {
    Terminal,
    /// Created, or truncated, when the logger is installed.
    File(PathBuf),
}

/// Installs the global logger for job lifecycle messages.
///
/// Returns `false` if the log file cannot be created or another logger is
/// already installed.
pub fn initialize(destination: LogDestination, level: LevelFilter) -> bool {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Debug)
        .build();

    let logger: Box<dyn SharedLogger> = match destination {
        LogDestination::Terminal => {
            TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
        }
        LogDestination::File(path) => match File::create(&path) {
            Ok(file) => WriteLogger::new(level, config, file),
            Err(err) => {
                eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
                return false;
            }
        },
    };

    simplelog::CombinedLogger::init(vec![logger]).is_ok()
}

/// Terminal logger for tests; safe to call from every test.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = simplelog::CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
