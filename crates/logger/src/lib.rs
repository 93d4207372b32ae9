use std::fmt;
use std::str::FromStr;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "E"),
            LogLevel::Warn => write!(f, "W"),
            LogLevel::Info => write!(f, "I"),
            LogLevel::Debug => write!(f, "D"),
            LogLevel::Trace => write!(f, "T"),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl LogLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }

    pub fn logger(self) -> ConsoleLogger {
        ConsoleLogger::new(self)
    }
}

/// Logs to the console as `I(render::stage): message`, with the record's
/// target standing in for the module path.
#[derive(Debug)]
pub struct ConsoleLogger {
    pub level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(level: LogLevel) -> Self {
        ConsoleLogger { level }
    }

    pub fn format(&self, record: &Record) -> String {
        format!(
            "{}({}): {}",
            LogLevel::from(record.level()),
            record.target(),
            record.args()
        )
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        LogLevel::from(metadata.level()) <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // errors and warnings go to stderr so `render` output piping stays clean
            match record.level() {
                log::Level::Error | log::Level::Warn => eprintln!("{}", self.format(record)),
                _ => println!("{}", self.format(record)),
            }
        }
    }

    fn flush(&self) {}
}

/// Installs a [`ConsoleLogger`] as the global `log` logger.
///
/// Fails if a logger was already installed for this process.
pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(level.logger()))?;
    log::set_max_level(level.level_filter());
    Ok(())
}
