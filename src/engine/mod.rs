//! Structured JSON event engine
//!
//! A small leveled logger that writes one JSON object per line to a [`Sink`].
//! Loggers are immutable by convention: every configuration change goes
//! through [`Engine::with`] and produces a new engine whose context fields are
//! copied on write, so engines can be shared freely across requests.
//!
//! # Example
//!
//! ```
//! use reqlog::engine::{Buffer, Engine, Record, Sink};
//!
//! let buffer = Buffer::new();
//! let engine = Engine::new(Sink::from(buffer.clone()))
//!     .with()
//!     .str("service", "api")
//!     .logger();
//!
//! engine.info().int("port", 8080).msg("listening");
//! assert_eq!(
//!     buffer.contents(),
//!     "{\"level\":\"info\",\"service\":\"api\",\"port\":8080,\"message\":\"listening\"}\n"
//! );
//! ```

mod event;
mod hook;
mod level;
mod sink;

pub use event::{Dict, Event, Record};
pub use hook::Hook;
pub use level::{global_level, init_global_level, Level};
pub use sink::{Buffer, Sink};

use event::Done;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Leveled JSON logger bound to a sink.
#[derive(Clone)]
pub struct Engine {
    sink: Sink,
    level: Level,
    global: Level,
    context: Arc<Map<String, Value>>,
    timestamp: bool,
    caller: bool,
    hooks: Arc<Vec<Arc<dyn Hook>>>,
}

impl Engine {
    /// New engine writing to `sink`, accepting every level and bound to the
    /// process-wide minimum severity.
    pub fn new(sink: Sink) -> Self {
        Self {
            sink,
            level: Level::Trace,
            global: global_level(),
            context: Arc::new(Map::new()),
            timestamp: false,
            caller: false,
            hooks: Arc::new(Vec::new()),
        }
    }

    /// Start a context chain from this engine's configuration.
    pub fn with(&self) -> Context {
        Context {
            engine: self.clone(),
        }
    }

    pub fn with_min_level(&self, level: Level) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }

    /// Replace the captured process-wide minimum for this engine and its derivatives.
    pub fn with_global_level(&self, global: Level) -> Self {
        Self {
            global,
            ..self.clone()
        }
    }

    /// Same configuration, different destination.
    pub fn with_output(&self, sink: Sink) -> Self {
        Self {
            sink,
            ..self.clone()
        }
    }

    pub fn with_hook(&self, hook: Arc<dyn Hook>) -> Self {
        let mut hooks = Vec::clone(&self.hooks);
        hooks.push(hook);
        Self {
            hooks: Arc::new(hooks),
            ..self.clone()
        }
    }

    /// Instance minimum severity.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Process-wide minimum severity this engine honors.
    pub fn global_level(&self) -> Level {
        self.global
    }

    pub fn output(&self) -> &Sink {
        &self.sink
    }

    /// Context fields attached to every event.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Whether an event at `level` passes both thresholds.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Disabled && level >= self.level && level >= self.global
    }

    /// Event at `level`. Unlike [`Engine::fatal`] and [`Engine::panic`], never
    /// terminates the program.
    #[track_caller]
    pub fn event(&self, level: Level) -> Event {
        Event::new(self, level, None)
    }

    /// Event without a level field.
    #[track_caller]
    pub fn log(&self) -> Event {
        Event::new(self, Level::NoLevel, None)
    }

    #[track_caller]
    pub fn trace(&self) -> Event {
        self.event(Level::Trace)
    }

    #[track_caller]
    pub fn debug(&self) -> Event {
        self.event(Level::Debug)
    }

    #[track_caller]
    pub fn info(&self) -> Event {
        self.event(Level::Info)
    }

    #[track_caller]
    pub fn warn(&self) -> Event {
        self.event(Level::Warn)
    }

    #[track_caller]
    pub fn error(&self) -> Event {
        self.event(Level::Error)
    }

    /// Error-level event carrying `error` under the `error` key.
    #[track_caller]
    pub fn err(&self, error: &dyn fmt::Display) -> Event {
        self.event(Level::Error).err(error)
    }

    /// Fatal event; the process exits with status 1 once the message is written.
    #[track_caller]
    pub fn fatal(&self) -> Event {
        Event::new(self, Level::Fatal, Some(Done::Exit))
    }

    /// Panic event; the caller panics with the message once it is written.
    #[track_caller]
    pub fn panic(&self) -> Event {
        Event::new(self, Level::Panic, Some(Done::Panic))
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("level", &self.level)
            .field("global", &self.global)
            .field("context", &self.context)
            .field("timestamp", &self.timestamp)
            .field("caller", &self.caller)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Field chain under construction; [`Context::logger`] turns it back into an engine.
#[derive(Clone, Debug)]
pub struct Context {
    engine: Engine,
}

impl Context {
    /// Add the emission time under `time`.
    pub fn timestamp(mut self) -> Self {
        self.engine.timestamp = true;
        self
    }

    /// Add the call site under `caller`.
    pub fn caller(mut self) -> Self {
        self.engine.caller = true;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.engine.level = level;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.engine = self.engine.with_hook(hook);
        self
    }

    pub fn logger(self) -> Engine {
        self.engine
    }
}

impl Record for Context {
    fn insert(&mut self, key: &str, value: Value) {
        Arc::make_mut(&mut self.engine.context).insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn engine() -> (Engine, Buffer) {
        let buffer = Buffer::new();
        (Engine::new(Sink::from(buffer.clone())), buffer)
    }

    #[test]
    fn test_context_is_copy_on_write() {
        let (base, buffer) = engine();
        let derived = base.with().str("id", "abc").logger();

        base.info().send();
        derived.info().send();

        assert_eq!(
            buffer.lines(),
            vec![
                "{\"level\":\"info\"}".to_string(),
                "{\"level\":\"info\",\"id\":\"abc\"}".to_string(),
            ]
        );
        assert!(base.context().is_empty());
    }

    #[test]
    fn test_global_level_is_a_floor() {
        let (engine, buffer) = engine();
        let engine = engine.with_global_level(Level::Warn);

        engine.debug().msg("hidden");
        assert!(buffer.is_empty());

        engine.error().msg("shown");
        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_no_level_passes_off_logger() {
        let (engine, buffer) = engine();
        let engine = engine.with_min_level(Level::NoLevel);

        engine.error().msg("hidden");
        engine.log().msg("shown");

        assert_eq!(buffer.contents(), "{\"message\":\"shown\"}\n");
    }

    #[test]
    fn test_disabled_engine_drops_everything() {
        let (engine, buffer) = engine();
        let engine = engine.with_min_level(Level::Disabled);
        engine.log().msg("x");
        engine.error().msg("y");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_err_sets_error_level_and_field() {
        let (engine, buffer) = engine();
        engine.err(&"broken pipe").send();
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"error\",\"error\":\"broken pipe\"}\n"
        );
    }

    #[test]
    fn test_with_output_keeps_context() {
        let (engine, first) = engine();
        let engine = engine.with().str("k", "v").logger();
        let second = Buffer::new();
        let moved = engine.with_output(Sink::from(second.clone()));

        moved.info().send();

        assert!(first.is_empty());
        assert_eq!(second.contents(), "{\"level\":\"info\",\"k\":\"v\"}\n");
    }

    #[test]
    fn test_hooks_run_in_order_and_can_add_fields() {
        let (engine, buffer) = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let engine = engine
            .with()
            .hook(Arc::new(move |_: &mut Event, level: Level, msg: &str| {
                recorder.lock().unwrap().push((level, msg.to_string()));
            }))
            .hook(Arc::new(|event: &mut Event, _: Level, _: &str| {
                event.insert("hooked", Value::Bool(true));
            }))
            .logger();

        engine.info().msg("Foo");
        engine.debug().send();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Level::Info, "Foo".to_string()), (Level::Debug, String::new())]
        );
        assert!(buffer.lines()[0].contains("\"hooked\":true"));
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let (engine, buffer) = engine();
        let engine = engine.with().timestamp().logger();
        engine.info().send();
        let value: Value = serde_json::from_str(buffer.contents().trim()).unwrap();
        let time = value["time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[test]
    fn test_caller_points_at_call_site() {
        let (engine, buffer) = engine();
        let engine = engine.with().caller().logger();
        engine.info().send();
        let value: Value = serde_json::from_str(buffer.contents().trim()).unwrap();
        let caller = value["caller"].as_str().unwrap();
        assert!(caller.starts_with(file!()), "caller was {}", caller);
    }
}
