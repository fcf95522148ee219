use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;

pub mod echo;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an echo server.
    Echo(EchoArgs),
    /// Send one message and print the response.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Pipe path to bind.
    pub path: PathBuf,
    /// Per-connection read buffer capacity in bytes.
    #[arg(long, default_value_t = msgpipe_transport::DEFAULT_BUFFER_CAPACITY)]
    pub read_capacity: usize,
    /// Per-connection write buffer capacity in bytes.
    #[arg(long, default_value_t = msgpipe_transport::DEFAULT_BUFFER_CAPACITY)]
    pub write_capacity: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Pipe path to connect to.
    pub path: PathBuf,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// How long to wait for the endpoint to appear (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Read buffer capacity in bytes.
    #[arg(long, default_value_t = msgpipe_transport::DEFAULT_BUFFER_CAPACITY)]
    pub read_capacity: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
