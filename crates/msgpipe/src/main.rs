mod cmd;
mod exit;
mod logging;

use clap::Parser;
use tracing::Level;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "msgpipe", version, about = "Message-oriented pipe transport CLI")]
struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "MSGPIPE_LOG",
        value_parser = logging::parse_level,
        global = true
    )]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match cmd::run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_echo_subcommand() {
        let cli = Cli::try_parse_from(["msgpipe", "echo", "/tmp/test.sock", "--read-capacity", "20"])
            .expect("echo args should parse");

        match cli.command {
            Command::Echo(args) => assert_eq!(args.read_capacity, 20),
            other => panic!("expected echo command, got {other:?}"),
        }
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from(["msgpipe", "send", "/tmp/test.sock", "--data", "hello"])
            .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn parses_log_level_flag() {
        let cli = Cli::try_parse_from(["msgpipe", "--log-level", "debug", "version"])
            .expect("log level should parse");
        assert_eq!(cli.log_level, Level::DEBUG);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Cli::try_parse_from(["msgpipe", "--log-level", "loud", "version"])
            .expect_err("unknown level should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "msgpipe",
            "send",
            "/tmp/test.sock",
            "--data",
            "hello",
            "--file",
            "/tmp/payload.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
