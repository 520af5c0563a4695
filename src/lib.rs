//! reqlog - structured JSON logging for axum services
//!
//! A leveled [`Logger`] over a small JSON event [`engine`], and a tower
//! middleware ([`logging::RequestLoggerLayer`]) that writes one structured
//! line per HTTP exchange and hands a request-scoped logger to handlers.

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod level;
pub mod logger;
pub mod logging;
pub mod options;

pub use context::{ctx, engine_ctx, MissingLogger};
pub use engine::Record;
pub use level::{effective_level, match_level, match_lvl, Lvl, ParseLevelError};
pub use logger::{Json, LevelLogger, Logger, NO_LEVEL_MARKER};
pub use options::{Options, Setter, PREFIX_KEY};
