//! Engine severity levels and the process-wide minimum severity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::level::ParseLevelError;

/// Severity of an engine event.
///
/// Ordering follows the numeric value: a higher level is more severe and,
/// when used as a minimum, filters out more events. `NoLevel` events carry
/// no `level` field and only pass loggers whose minimum is at most `NoLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i8)]
pub enum Level {
    Trace = -1,
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Panic = 5,
    #[serde(rename = "")]
    NoLevel = 6,
    Disabled = 7,
}

impl Level {
    /// Value written to the `level` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
            Level::NoLevel => "",
            Level::Disabled => "disabled",
        }
    }

    /// Whether events at this level carry a `level` field.
    pub(crate) fn is_named(&self) -> bool {
        !matches!(self, Level::NoLevel | Level::Disabled)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            "" => Ok(Level::NoLevel),
            "disabled" => Ok(Level::Disabled),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

static GLOBAL_LEVEL: OnceLock<Level> = OnceLock::new();

/// Set the process-wide minimum severity.
///
/// Must be called once at process start, before any engine is created.
/// Returns the already-installed level if it was set before.
pub fn init_global_level(level: Level) -> Result<(), Level> {
    GLOBAL_LEVEL.set(level).map_err(|_| global_level())
}

/// Process-wide minimum severity (`Trace` unless initialized).
pub fn global_level() -> Level {
    GLOBAL_LEVEL.get().copied().unwrap_or(Level::Trace)
}
