//! Event and sub-record builders.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::panic::Location;
use std::time::Duration;

use super::{Engine, Level};

/// Field attachment shared by events, detached sub-records and contexts.
///
/// All methods consume and return the builder so calls chain:
/// `engine.info().str("k", "v").int("n", 1).send()`.
pub trait Record: Sized {
    /// Insert a raw JSON value. Existing keys are overwritten in place.
    fn insert(&mut self, key: &str, value: Value);

    fn str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, Value::String(value.into()));
        self
    }

    fn int(mut self, key: &str, value: impl Into<i64>) -> Self {
        self.insert(key, Value::from(value.into()));
        self
    }

    fn uint(mut self, key: &str, value: impl Into<u64>) -> Self {
        self.insert(key, Value::from(value.into()));
        self
    }

    fn bool(mut self, key: &str, value: bool) -> Self {
        self.insert(key, Value::Bool(value));
        self
    }

    /// Duration as floating-point milliseconds.
    fn dur(mut self, key: &str, value: Duration) -> Self {
        self.insert(key, Value::from(value.as_secs_f64() * 1000.0));
        self
    }

    /// Any serializable value. Values that fail to serialize are recorded as their error text.
    fn field<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.insert(key, value);
        self
    }

    fn fields(mut self, fields: Map<String, Value>) -> Self {
        for (key, value) in fields {
            self.insert(&key, value);
        }
        self
    }
}

/// What happens after a terminal level is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Done {
    Exit,
    Panic,
}

/// A single log record under construction.
///
/// Events below the engine's threshold are inert: field calls are no-ops
/// and sending writes nothing.
pub struct Event {
    inner: Option<Box<Inner>>,
    done: Option<Done>,
}

struct Inner {
    level: Level,
    fields: Map<String, Value>,
    engine: Engine,
    location: &'static Location<'static>,
}

impl Event {
    #[track_caller]
    pub(crate) fn new(engine: &Engine, level: Level, done: Option<Done>) -> Self {
        let location = Location::caller();
        let inner = engine.enabled(level).then(|| {
            Box::new(Inner {
                level,
                fields: Map::new(),
                engine: engine.clone(),
                location,
            })
        });
        Self { inner, done }
    }

    /// Whether this event will be written.
    pub fn enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Attach an error under the `error` key.
    pub fn err(self, error: &dyn fmt::Display) -> Self {
        self.str("error", error.to_string())
    }

    /// Attach a detached sub-record under `key`.
    pub fn dict(mut self, key: &str, dict: Dict) -> Self {
        self.insert(key, Value::Object(dict.fields));
        self
    }

    /// Write the event without a message.
    pub fn send(self) {
        self.msg("")
    }

    pub fn msgf(self, args: fmt::Arguments<'_>) {
        self.msg(&fmt::format(args))
    }

    /// Write the event with `message`.
    pub fn msg(mut self, message: &str) {
        let done = self.done;
        if let Some(inner) = self.inner.as_ref() {
            let hooks = inner.engine.hooks.clone();
            let level = inner.level;
            for hook in hooks.iter() {
                hook.run(&mut self, level, message);
            }
        }
        if let Some(inner) = self.inner.take() {
            let sink = inner.engine.sink.clone();
            sink.write_line(&inner.encode(message));
        }
        match done {
            Some(Done::Exit) => std::process::exit(1),
            Some(Done::Panic) => panic!("{}", message),
            None => {}
        }
    }
}

impl Record for Event {
    fn insert(&mut self, key: &str, value: Value) {
        if let Some(inner) = self.inner.as_mut() {
            inner.fields.insert(key.to_string(), value);
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Event")
                .field("level", &inner.level)
                .field("fields", &inner.fields)
                .finish(),
            None => f.write_str("Event(disabled)"),
        }
    }
}

impl Inner {
    fn encode(self, message: &str) -> Vec<u8> {
        let mut out = Map::new();
        if self.level.is_named() {
            out.insert("level".to_string(), Value::from(self.level.as_str()));
        }
        for (key, value) in self.engine.context.iter() {
            out.insert(key.clone(), value.clone());
        }
        for (key, value) in self.fields {
            out.insert(key, value);
        }
        if self.engine.timestamp {
            let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
            out.insert("time".to_string(), Value::from(now));
        }
        if self.engine.caller {
            let caller = format!("{}:{}", self.location.file(), self.location.line());
            out.insert("caller".to_string(), Value::from(caller));
        }
        if !message.is_empty() {
            out.insert("message".to_string(), Value::from(message));
        }

        // A Map of Values always serializes.
        let mut line = serde_json::to_vec(&Value::Object(out)).unwrap_or_default();
        line.push(b'\n');
        line
    }
}

/// Detached sub-record, nested into an event with [`Event::dict`].
#[derive(Debug, Clone, Default)]
pub struct Dict {
    fields: Map<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Record for Dict {
    fn insert(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }
}
