use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a telemetry demultiplexer server.
    Serve(ServeArgs),
    /// Send a single frame to a running server.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Device capability descriptor (JSON).
    #[arg(long, value_name = "FILE")]
    pub descriptor: PathBuf,
    /// Address to bind. Defaults to an ephemeral loopback port.
    #[arg(long)]
    pub addr: Option<SocketAddr>,
    /// Exit after receiving N sample frames.
    #[arg(long)]
    pub frames: Option<usize>,
    /// Suppress per-event output (the port announcement still prints).
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address to connect to (host:port).
    pub addr: String,
    /// Channel names, in payload interleave order.
    #[arg(long, short = 'c', value_delimiter = ',', required = true)]
    pub channels: Vec<String>,
    /// Interleaved float samples.
    #[arg(long, value_delimiter = ',', conflicts_with = "max_points")]
    pub data: Option<Vec<f32>>,
    /// Send a buffer-capacity hint instead of samples.
    #[arg(long, conflicts_with = "data")]
    pub max_points: Option<i64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
