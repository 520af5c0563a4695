//! Logger configuration steps
//!
//! A [`Logger`](crate::Logger) remembers the ordered list of [`Setter`]s it
//! was built from. Rebuilding (after `set_level`, `set_prefix`, or when
//! cloning) replays that list over the base engine, so derived loggers are
//! reproducible and never share mutable state.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::engine::{Context, Engine, Event, Hook, Level, Record};
use crate::level::{effective_level, match_level, match_lvl, Lvl};

/// Field under which the logger prefix is written.
pub const PREFIX_KEY: &str = "prefix";

/// A single configuration step. Later steps override earlier ones.
#[derive(Clone)]
pub enum Setter {
    /// Minimum severity.
    Level(Lvl),
    /// Constant field on every event.
    Field(String, Value),
    /// Batch of constant fields.
    Fields(Map<String, Value>),
    /// Emission time under `time`.
    Timestamp,
    /// Call site under `caller`.
    Caller,
    /// Prefix, written under `prefix`.
    Prefix(String),
    /// Hook run on every emission.
    Hook(Arc<dyn Hook>),
}

impl Setter {
    /// `Field` from any serializable value.
    pub fn field<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        Setter::Field(name.into(), value)
    }

    /// `Hook` from a closure.
    pub fn hook_fn<F>(hook: F) -> Self
    where
        F: Fn(&mut Event, Level, &str) + Send + Sync + 'static,
    {
        Setter::Hook(Arc::new(hook))
    }

    fn apply(&self, opts: Options) -> Options {
        let Options {
            context,
            level,
            prefix,
        } = opts;

        match self {
            Setter::Level(lvl) => {
                let (engine_level, lvl) = match_lvl(*lvl);
                Options {
                    context: context.level(engine_level),
                    level: lvl,
                    prefix,
                }
            }
            Setter::Field(name, value) => Options {
                context: context.field(name, value),
                level,
                prefix,
            },
            Setter::Fields(fields) => Options {
                context: context.fields(fields.clone()),
                level,
                prefix,
            },
            Setter::Timestamp => Options {
                context: context.timestamp(),
                level,
                prefix,
            },
            Setter::Caller => Options {
                context: context.caller(),
                level,
                prefix,
            },
            Setter::Prefix(new_prefix) => Options {
                context: context.str(PREFIX_KEY, new_prefix.clone()),
                level,
                prefix: new_prefix.clone(),
            },
            Setter::Hook(hook) => Options {
                context: context.hook(Arc::clone(hook)),
                level,
                prefix,
            },
        }
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setter::Level(lvl) => f.debug_tuple("Level").field(lvl).finish(),
            Setter::Field(name, value) => f.debug_tuple("Field").field(name).field(value).finish(),
            Setter::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Setter::Timestamp => f.write_str("Timestamp"),
            Setter::Caller => f.write_str("Caller"),
            Setter::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            Setter::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Builder state produced by folding setters over a base engine.
#[derive(Debug, Clone)]
pub struct Options {
    pub context: Context,
    pub level: Lvl,
    pub prefix: String,
}

impl Options {
    /// Fold `setters` over `base`. The starting API level reflects the
    /// base engine's effective threshold, process-wide minimum included.
    pub fn build(base: &Engine, setters: &[Setter]) -> Self {
        let (level, _) = match_level(effective_level(base));
        let initial = Options {
            context: base.with(),
            level,
            prefix: String::new(),
        };

        setters.iter().fold(initial, |opts, setter| setter.apply(opts))
    }
}
