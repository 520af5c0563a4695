//! Level mapping between the logger API and the engine
//!
//! The [`LevelLogger`](crate::LevelLogger) API works with the coarse [`Lvl`]
//! enum; the engine filters on the finer [`Level`]. The two `match_*`
//! functions translate in either direction and always return the pair that
//! was actually matched, falling back to the "off / no level" pair for
//! anything outside the mapped domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::engine::{Engine, Level};

/// Severity levels exposed by the logger API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lvl {
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl Lvl {
    pub const ALL: [Lvl; 5] = [Lvl::Debug, Lvl::Info, Lvl::Warn, Lvl::Error, Lvl::Off];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lvl::Debug => "debug",
            Lvl::Info => "info",
            Lvl::Warn => "warn",
            Lvl::Error => "error",
            Lvl::Off => "off",
        }
    }
}

impl fmt::Display for Lvl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lvl {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Lvl::Debug),
            "info" => Ok(Lvl::Info),
            "warn" | "warning" => Ok(Lvl::Warn),
            "error" => Ok(Lvl::Error),
            "off" => Ok(Lvl::Off),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log level: {0:?}")]
pub struct ParseLevelError(pub String);

/// Engine level for an API level, with the API level actually matched.
pub fn match_lvl(lvl: Lvl) -> (Level, Lvl) {
    match lvl {
        Lvl::Debug => (Level::Debug, Lvl::Debug),
        Lvl::Info => (Level::Info, Lvl::Info),
        Lvl::Warn => (Level::Warn, Lvl::Warn),
        Lvl::Error => (Level::Error, Lvl::Error),
        Lvl::Off => (Level::NoLevel, Lvl::Off),
    }
}

/// API level for an engine level, with the engine level actually matched.
///
/// `Trace` folds into `Debug`; levels the API has no counterpart for
/// (`Fatal`, `Panic`, `Disabled`) resolve to `(Off, NoLevel)`.
pub fn match_level(level: Level) -> (Lvl, Level) {
    match level {
        Level::Trace => (Lvl::Debug, Level::Trace),
        Level::Debug => (Lvl::Debug, Level::Debug),
        Level::Info => (Lvl::Info, Level::Info),
        Level::Warn => (Lvl::Warn, Level::Warn),
        Level::Error => (Lvl::Error, Level::Error),
        Level::NoLevel => (Lvl::Off, Level::NoLevel),
        _ => (Lvl::Off, Level::NoLevel),
    }
}

/// The threshold `engine` actually filters on: the stricter of its own
/// minimum and the process-wide minimum it honors.
pub fn effective_level(engine: &Engine) -> Level {
    engine.level().max(engine.global_level())
}
