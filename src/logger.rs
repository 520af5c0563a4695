//! Logger adapter
//!
//! [`Logger`] exposes an [`Engine`] through the [`LevelLogger`] capability
//! set: leveled emission in plain, formatted and structured forms, plus
//! level, prefix and output management.
//!
//! # Example
//!
//! ```
//! use reqlog::engine::Buffer;
//! use reqlog::{LevelLogger, Logger, Lvl, Setter};
//!
//! let buffer = Buffer::new();
//! let mut logger = Logger::new(buffer.clone().into(), vec![Setter::Prefix("api".into())]);
//! logger.set_level(Lvl::Info);
//!
//! logger.debug(&"dropped");
//! logger.infof(format_args!("listening on {}", 8080));
//!
//! assert_eq!(
//!     buffer.contents(),
//!     "{\"level\":\"info\",\"prefix\":\"api\",\"message\":\"listening on 8080\"}\n"
//! );
//! ```

use serde_json::{Map, Value};
use std::fmt;

use crate::engine::{Engine, Event, Level, Record, Sink};
use crate::level::{effective_level, match_level, Lvl};
use crate::options::{Options, Setter};

/// Structured payload for the `*j` emission forms.
pub type Json = Map<String, Value>;

/// Value written under `level` by the `print*` forms.
pub const NO_LEVEL_MARKER: &str = "-";

/// Generic logger capability set.
///
/// Every severity comes in three forms: `x` writes a displayable message,
/// `xf` a formatted one, `xj` a map flattened into fields with no message.
/// `print*` writes without a severity, tagged `"level":"-"`. `fatal*` exits
/// the process and `panic*` panics after writing.
pub trait LevelLogger: Send + Sync {
    fn output(&self) -> &Sink;
    fn set_output(&mut self, sink: Sink);
    fn prefix(&self) -> &str;
    fn set_prefix(&mut self, prefix: &str);
    fn level(&self) -> Lvl;
    fn set_level(&mut self, lvl: Lvl);

    #[track_caller]
    fn print(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn printf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn printj(&self, j: Json);

    #[track_caller]
    fn debug(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn debugf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn debugj(&self, j: Json);

    #[track_caller]
    fn info(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn infof(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn infoj(&self, j: Json);

    #[track_caller]
    fn warn(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn warnf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn warnj(&self, j: Json);

    #[track_caller]
    fn error(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn errorf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn errorj(&self, j: Json);

    #[track_caller]
    fn fatal(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn fatalf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn fatalj(&self, j: Json);

    #[track_caller]
    fn panic(&self, msg: &dyn fmt::Display);
    #[track_caller]
    fn panicf(&self, args: fmt::Arguments<'_>);
    #[track_caller]
    fn panicj(&self, j: Json);
}

/// [`LevelLogger`] backed by an [`Engine`].
///
/// `base` is the engine the setters are replayed over; `engine` is the
/// configured result. The cached `level` always equals the configured
/// engine's minimum translated through [`match_level`](crate::match_level).
#[derive(Debug, Clone)]
pub struct Logger {
    base: Engine,
    engine: Engine,
    level: Lvl,
    prefix: String,
    setters: Vec<Setter>,
}

impl Logger {
    /// Logger writing to `sink`.
    pub fn new(sink: Sink, setters: Vec<Setter>) -> Self {
        Self::from_engine(Engine::new(sink), setters)
    }

    /// Logger on top of an existing engine. The reported level reflects the
    /// engine's effective threshold, not just its instance minimum.
    pub fn from_engine(base: Engine, setters: Vec<Setter>) -> Self {
        let opts = Options::build(&base, &setters);

        Self {
            base,
            engine: opts.context.logger(),
            level: opts.level,
            prefix: opts.prefix,
            setters,
        }
    }

    /// Independent logger built from the same base and setters, plus `setters`.
    pub fn clone_with(&self, setters: impl IntoIterator<Item = Setter>) -> Self {
        let mut all = self.setters.clone();
        all.extend(setters);
        Self::from_engine(self.base.clone(), all)
    }

    /// Logger built on top of this one's configured engine. Rebuilding the
    /// result replays only `setters`, never the parent's.
    pub(crate) fn derive(&self, setters: Vec<Setter>) -> Self {
        let mut derived = Self::from_engine(self.engine.clone(), setters);
        if derived.prefix.is_empty() {
            derived.prefix = self.prefix.clone();
        }
        derived
    }

    /// Logger adopting `engine` as both base and configured engine.
    ///
    /// The setter list starts empty, so later rebuilds replay over `engine`
    /// and keep whatever it carries. The prefix is inherited.
    pub(crate) fn with_engine(&self, engine: Engine) -> Self {
        let (level, _) = match_level(effective_level(&engine));
        Self {
            base: engine.clone(),
            engine,
            level,
            prefix: self.prefix.clone(),
            setters: Vec::new(),
        }
    }

    /// The configured engine.
    pub fn unwrap(&self) -> &Engine {
        &self.engine
    }

    pub fn setters(&self) -> &[Setter] {
        &self.setters
    }

    fn rebuild(&mut self, setter: Setter) {
        self.setters.push(setter);
        let opts = Options::build(&self.base, &self.setters);
        self.engine = opts.context.logger();
        self.level = opts.level;
        // An inherited prefix stays until a setter replaces it.
        if !opts.prefix.is_empty() {
            self.prefix = opts.prefix;
        }
    }

    #[track_caller]
    fn print_event(&self) -> Event {
        self.engine.log().str("level", NO_LEVEL_MARKER)
    }
}

fn log_json(event: Event, j: Json) {
    event.fields(j).send();
}

macro_rules! leveled {
    ($level:ident, $plain:ident, $formatted:ident, $json:ident) => {
        fn $plain(&self, msg: &dyn fmt::Display) {
            self.engine.$level().msg(&msg.to_string());
        }

        fn $formatted(&self, args: fmt::Arguments<'_>) {
            self.engine.$level().msgf(args);
        }

        fn $json(&self, j: Json) {
            log_json(self.engine.$level(), j);
        }
    };
}

impl LevelLogger for Logger {
    fn output(&self) -> &Sink {
        self.engine.output()
    }

    fn set_output(&mut self, sink: Sink) {
        self.base = self.base.with_output(sink.clone());
        self.engine = self.engine.with_output(sink);
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.rebuild(Setter::Prefix(prefix.to_string()));
    }

    fn level(&self) -> Lvl {
        self.level
    }

    fn set_level(&mut self, lvl: Lvl) {
        self.rebuild(Setter::Level(lvl));
    }

    fn print(&self, msg: &dyn fmt::Display) {
        self.print_event().msg(&msg.to_string());
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        self.print_event().msgf(args);
    }

    fn printj(&self, j: Json) {
        log_json(self.print_event(), j);
    }

    leveled!(debug, debug, debugf, debugj);
    leveled!(info, info, infof, infoj);
    leveled!(warn, warn, warnf, warnj);
    leveled!(error, error, errorf, errorj);
    leveled!(fatal, fatal, fatalf, fatalj);
    leveled!(panic, panic, panicf, panicj);
}

impl Default for Logger {
    /// Stdout logger with timestamps.
    fn default() -> Self {
        Logger::new(Sink::stdout(), vec![Setter::Timestamp])
    }
}

impl From<Engine> for Logger {
    fn from(engine: Engine) -> Self {
        Logger::from_engine(engine, Vec::new())
    }
}

/// Level a logger emits at when nothing escalates it.
pub(crate) fn normal_level(logger: &Logger) -> Level {
    logger.engine.level()
}
