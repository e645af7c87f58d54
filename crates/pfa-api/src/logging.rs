//! Logging setup.
//!
//! One `tracing` subscriber serves both the server and the CLI. `RUST_LOG`
//! wins over the verbosity flags when set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much to log, chosen by `-q` / `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above, plus per-request traces.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Map `-q` and a count of `-v` flags to a level. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Maximum level emitted by this crate.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    ///
    /// `tower_http` request spans only appear from `Verbose` on; other
    /// dependencies stay at warnings.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level().to_string().to_ascii_lowercase();
        match self {
            Self::Quiet | Self::Normal => format!("warn,pfa_api={level}"),
            Self::Verbose | Self::Trace => format!("warn,pfa_api={level},tower_http={level}"),
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which happens when
/// tests call this more than once.
///
/// ```no_run
/// use pfa_api::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
