//! Process-wide verbosity, threaded through reader/writer constructors
//! rather than read from a hidden global at call time (see the design notes
//! on the process-wide verbosity threshold). `init` still installs the
//! usual `env_logger` backend, once, so call sites can simply use the
//! `log` macros.

use std::sync::Once;

/// `1` = error, `2` = warning, `3` = message, `4` = progress, `5+` = debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity(2)
    }
}

impl Verbosity {
    pub fn level_filter(self) -> log::LevelFilter {
        match self.0 {
            0 | 1 => log::LevelFilter::Error,
            2 => log::LevelFilter::Warn,
            3 => log::LevelFilter::Info,
            4 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

static INIT: Once = Once::new();

/// Install `env_logger` at the level implied by `verbosity`. Safe to call
/// more than once; only the first call takes effect.
pub fn init(verbosity: Verbosity) {
    INIT.call_once(|| {
        env_logger::Builder::new()
            .filter_level(verbosity.level_filter())
            .format_timestamp(None)
            .init();
    });
}
