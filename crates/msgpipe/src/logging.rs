use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Output format for diagnostics on stderr.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Parses a `--log-level` / `MSGPIPE_LOG` value.
pub fn parse_level(input: &str) -> Result<Level, String> {
    input
        .parse()
        .map_err(|_| format!("unknown log level: {input} (use error, warn, info, debug, trace)"))
}

/// Install the global stderr subscriber for the msgpipe binary.
///
/// Stdout stays reserved for command output (echo replies, received
/// payloads, version info); all diagnostics go to stderr.
pub fn init_logging(format: LogFormat, level: Level) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from_level(level))
        .with_ansi(false)
        .with_target(false);

    // A subscriber may already be installed when embedded in tests;
    // keep the first one.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_accepts_tracing_names() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("TRACE").unwrap(), Level::TRACE);
    }

    #[test]
    fn parse_level_rejects_unknown_names() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.contains("loud"));
    }
}
