//! # Structured Logging
//!
//! Sets up the `tracing` subscriber for the binary. Stdout carries only the
//! JSON result so it can be piped; every log line goes to stderr.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// JSON lines, one event per line.
    Json,
}

impl LogFormat {
    /// Parse a format string. Accepts "json" or "pretty" (case-insensitive).
    /// Returns `Pretty` for any unrecognized value.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Filter directives for the number of `-v` flags given.
///
/// Only this workspace is raised; dependencies such as `tungstenite` stay
/// at `warn`. The library and the binary both log under `rippled_sign`.
pub fn directives_for(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,rippled_sign={level}")
}

/// Install the global subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` wins over `verbosity` when set, e.g.
///
/// ```text
/// RUST_LOG=rippled_sign::finality=trace rippled-sign submit ...
/// ```
pub fn init_logging(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives_for(verbosity)));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity > 0),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lossy() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn verbosity_raises_only_our_crates() {
        assert_eq!(directives_for(0), "warn,rippled_sign=info");
        assert_eq!(directives_for(1), "warn,rippled_sign=debug");
        assert_eq!(directives_for(5), "warn,rippled_sign=trace");
        assert!(directives_for(5).starts_with("warn,"));
    }

    #[test]
    fn directives_parse() {
        for verbosity in 0..3 {
            assert!(EnvFilter::try_new(directives_for(verbosity)).is_ok());
        }
    }
}
