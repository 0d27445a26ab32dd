//! Config for the match orchestrator.
//!
//! Configuration can be created programmatically with
//! [`Configuration::new()`] or from environment variables with
//! [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional; an unset or unparseable variable falls back to
//! the default.
//!
//! - `ARENA_TITLE` — movie title handed to the game's `prepare` (default: `"match"`)
//! - `ARENA_ACTION_TIMEOUT_MS` — per-turn deadline in milliseconds (default: `2000`)
//! - `ARENA_COMPRESSION` — `NONE`, `LZ77` or `LZW` (default: `NONE`)
//! - `ARENA_LOG` — set to `"true"` to log to a timestamped file (default: `false`)

use std::env;
use std::time::Duration;

use crate::compression::Compression;

/// Configuration for one match orchestrator.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) title: String,
    pub(crate) action_timeout: Duration,
    pub(crate) compression: Compression,
    pub(crate) log: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The movie title is `"match"`.
    /// - Each player gets 2 seconds per turn.
    /// - Movies serialize uncompressed.
    /// - Logging to file is disabled.
    pub fn new() -> Self {
        Self {
            title: "match".to_owned(),
            action_timeout: Duration::from_millis(2000),
            compression: Compression::None,
            log: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Any
    /// other value (including unset) results in the default for that
    /// field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let defaults = Self::new();
        let title = env::var("ARENA_TITLE").unwrap_or(defaults.title);
        let action_timeout = env::var("ARENA_ACTION_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.action_timeout);
        let compression = env::var("ARENA_COMPRESSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.compression);

        Self {
            title,
            action_timeout,
            compression,
            log: get_env_flag("ARENA_LOG", false),
        }
    }

    /// Set the movie title handed to the game during preparation.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the maximum duration a player may take for a single action.
    #[must_use]
    pub fn with_action_timeout(mut self, duration: Duration) -> Self {
        self.action_timeout = duration;
        self
    }

    /// Set the compression mode used when serializing the movie.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable or disable logging to a timestamped file.
    #[must_use]
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
