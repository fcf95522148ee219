use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use msgpipe_server::{Connection, ConnectionObserver, PipeServer, SendStatus, ServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::EchoArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};

const REPLY_PREFIX: &[u8] = b"Pipe server received data: ";

/// Echoes each message back with a prefix. Oversized messages arrive as
/// partial chunks and are reassembled per connection before replying.
#[derive(Default)]
struct EchoObserver {
    partial: HashMap<u64, Vec<u8>>,
}

impl ConnectionObserver for EchoObserver {
    fn on_partial_data_received(&mut self, connection: &mut Connection, data: &[u8]) {
        self.partial
            .entry(connection.id())
            .or_default()
            .extend_from_slice(data);
        connection.listen_for_data();
    }

    fn on_data_received(&mut self, connection: &mut Connection, data: &[u8]) {
        let mut message = self.partial.remove(&connection.id()).unwrap_or_default();
        message.extend_from_slice(data);

        info!(
            id = connection.id(),
            size = message.len(),
            "echoing message"
        );

        let reply = build_reply(&message);
        if let SendStatus::Truncated { sent } = connection.send_data(&reply) {
            warn!(
                id = connection.id(),
                sent,
                dropped = reply.len() - sent,
                "reply truncated to write capacity"
            );
        }
    }
}

fn build_reply(message: &[u8]) -> Vec<u8> {
    let mut reply = REPLY_PREFIX.to_vec();
    if message.is_empty() {
        reply.extend_from_slice(b"<none>");
    } else {
        reply.extend_from_slice(message);
    }
    reply
}

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let observer = Rc::new(RefCell::new(EchoObserver::default()));
    let server = PipeServer::new(observer).with_config(ServerConfig {
        read_capacity: args.read_capacity,
        write_capacity: args.write_capacity,
    });

    let shutdown = CancellationToken::new();
    install_ctrlc_handler(shutdown.clone())?;

    // The engine is single-threaded by design; everything runs on this
    // current-thread runtime.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;

    runtime
        .block_on(server.run(&args.path, shutdown))
        .map_err(|err| server_error("server failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_carries_prefix_and_payload() {
        assert_eq!(build_reply(b"hello"), b"Pipe server received data: hello");
    }

    #[test]
    fn empty_message_gets_placeholder() {
        assert_eq!(build_reply(b""), b"Pipe server received data: <none>");
    }
}
