mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "telemux", version, about = "Streaming telemetry demultiplexer")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
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
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "telemux",
            "serve",
            "--descriptor",
            "device.json",
            "--frames",
            "10",
        ])
        .expect("serve args should parse");

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.descriptor.to_str(), Some("device.json"));
                assert_eq!(args.frames, Some(10));
                assert!(args.addr.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_send_with_channel_list_and_data() {
        let cli = Cli::try_parse_from([
            "telemux",
            "send",
            "127.0.0.1:9000",
            "--channels",
            "ai0,ai1",
            "--data",
            "1.0,2.0,3.0,4.0",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.channels, vec!["ai0", "ai1"]);
                assert_eq!(args.data, Some(vec![1.0, 2.0, 3.0, 4.0]));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "telemux",
            "send",
            "127.0.0.1:9000",
            "--channels",
            "ai0",
            "--data",
            "1.0",
            "--max-points",
            "100",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_channels() {
        let err = Cli::try_parse_from(["telemux", "send", "127.0.0.1:9000", "--data", "1.0"])
            .expect_err("missing --channels should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
