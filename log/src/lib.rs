use std::env;
use std::str::FromStr;
use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog::Level;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// The variable naming the minimum level to emit, e.g. `debug`.
pub const LEVEL_VARIABLE: &str = "RECIPES_LOG_LEVEL";

const DEFAULT_LEVEL: Level = Level::Info;

/// Builds the root JSON logger, writing to standard error.
pub fn initialize_logger() -> slog::Logger {
    let level = env::var(LEVEL_VARIABLE)
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(DEFAULT_LEVEL);

    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().filter_level(level).fuse();

    Logger::root(
        drain,
        o!("service" => info::NAME, "version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// Builds a logger that drops everything. Used by tests.
pub fn discard() -> slog::Logger {
    Logger::root(slog::Discard, o!())
}

/// Installs a global `slog-envlogger` logger configured from
/// `RUST_LOG`. The guard must be kept alive for as long as logging is
/// needed.
#[cfg(feature = "env_logging")]
pub fn initialize_env_logging(
) -> Result<slog_scope::GlobalLoggerGuard, Box<dyn std::error::Error>> {
    slog_envlogger::init().map_err(Into::into)
}

fn parse_level(raw: &str) -> Option<Level> {
    Level::from_str(raw.trim()).ok()
}
