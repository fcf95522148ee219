use std::fs;
use std::time::Duration;

use msgpipe_transport::{ClientChannel, ClientConfig};

use crate::cmd::SendArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args)?;

    let config = ClientConfig {
        read_capacity: args.read_capacity,
    };
    let mut channel = ClientChannel::connect_with_config(&args.path, timeout, config)
        .map_err(|err| transport_error("connect failed", err))?
        .ok_or_else(|| {
            CliError::new(
                TIMEOUT,
                format!("no endpoint at {} within {timeout:?}", args.path.display()),
            )
        })?;

    channel
        .send_data(&payload)
        .map_err(|err| transport_error("send failed", err))?;

    let mut response = Vec::new();
    channel
        .wait_for_data(&mut response)
        .map_err(|err| transport_error("receive failed", err))?;
    channel.disconnect();

    println!("{}", String::from_utf8_lossy(&response));
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn payload_defaults_to_empty() {
        let args = SendArgs {
            path: "/tmp/test.sock".into(),
            data: None,
            file: None,
            timeout: "5s".to_string(),
            read_capacity: 4096,
        };
        assert!(resolve_payload(&args).unwrap().is_empty());
    }
}
