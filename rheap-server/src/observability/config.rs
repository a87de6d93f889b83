//! Log output settings for the heap server.

use std::env;
use std::str::FromStr;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, colored, for a terminal.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}', expected json, pretty or compact"
            )),
        }
    }
}

/// Settings for [`init_tracing`](super::init_tracing).
///
/// Fields are public; [`from_env`](Self::from_env) fills them from
/// `RHEAP_LOG_*` variables and [`with_verbosity`](Self::with_verbosity)
/// maps the CLI's `-v` count onto a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives, e.g. `info,rheap_core=debug`.
    pub filter: String,
    /// Whether the filter came from the environment.
    pub filter_from_env: bool,
    /// Include file and line of each event.
    pub location: bool,
    /// Include thread ids.
    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
            filter_from_env: false,
            location: false,
            thread_ids: false,
        }
    }
}

impl TracingConfig {
    /// Read settings from the environment.
    ///
    /// - `RHEAP_LOG_FORMAT`: `json`, `pretty` or `compact`; when unset,
    ///   pretty on a terminal and JSON otherwise
    /// - `RHEAP_LOG_LEVEL`, then `RUST_LOG`: filter directives
    /// - `RHEAP_LOG_LOCATION`, `RHEAP_LOG_THREAD_IDS`: `1` or `true`
    pub fn from_env() -> Self {
        let format = match env::var("RHEAP_LOG_FORMAT") {
            Ok(value) => value.parse().unwrap_or_else(|err: String| {
                eprintln!("rheap: {err}; using compact");
                LogFormat::Compact
            }),
            Err(_) if std::io::IsTerminal::is_terminal(&std::io::stdout()) => LogFormat::Pretty,
            Err(_) => LogFormat::Json,
        };

        let filter = env::var("RHEAP_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")).ok();

        Self {
            format,
            filter_from_env: filter.is_some(),
            filter: filter.unwrap_or_else(|| "info".to_string()),
            location: env_flag("RHEAP_LOG_LOCATION"),
            thread_ids: env_flag("RHEAP_LOG_THREAD_IDS"),
        }
    }

    /// Raise the filter by the CLI's `-v` count unless the environment set
    /// one explicitly.
    ///
    /// `-v` turns on debug output for the heap crates, `-vv` debug
    /// everywhere, `-vvv` trace with source locations.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        if !self.filter_from_env {
            self.filter = match verbosity {
                0 => "info".to_string(),
                1 => "info,rheap_core=debug,rheap_server=debug".to_string(),
                2 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
        self.location |= verbosity >= 3;
        self
    }

    /// Use a different output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Use explicit filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self.filter_from_env = false;
        self
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
