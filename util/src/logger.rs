//! Logger initialisation
//!
//! Logs go to stdout with coloured level tags, and to the session's log file
//! without colours. Every line is stamped with the seconds elapsed since the
//! start of the session.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Level, Record};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Log target of the servo control module, whose per-write traces are filtered
/// separately.
pub const SERVO_TARGET: &str = "hexa_lib::servo_ctrl";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error opening the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// - `min_level` must let `INFO` messages through.
/// - `servo_level` is used for [`SERVO_TARGET`] in place of `min_level`.
///
/// Must be called once, after the session has been started.
pub fn logger_init(
    min_level: LevelFilter,
    servo_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                Line { record, message, colour: true }
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                Line { record, message, colour: false }
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for(SERVO_TARGET, servo_level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised for {}", session.exec_name);
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?} (servo writes: {:?})", min_level, servo_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// A single formatted log line.
struct Line<'a> {
    record: &'a Record<'a>,
    message: &'a fmt::Arguments<'a>,
    colour: bool,
}

impl<'a> fmt::Display for Line<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.record.level();

        write!(f, "[{:10.6} ", session::get_elapsed_seconds())?;

        if self.colour {
            write!(f, "{}]", level_tag_coloured(level))?;
        } else {
            write!(f, "{}]", level_tag(level))?;
        }

        // The target is only worth the space when debugging
        if level > Level::Info {
            write!(f, " {}:", self.record.target())?;
        }

        write!(f, " {}", self.message)
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn level_tag_coloured(level: Level) -> ColoredString {
    let tag = level_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}
