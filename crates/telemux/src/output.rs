use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use telemux_demux::SinkEvent;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    kind: &'a str,
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity: Option<i64>,
    timestamp: String,
}

/// Print one delivered sink event to stdout.
pub fn print_event(event: &SinkEvent, format: OutputFormat) {
    match event {
        SinkEvent::Samples {
            channel,
            samples,
            timestamp,
        } => match format {
            OutputFormat::Json => print_json(&EventOutput {
                kind: "samples",
                channel,
                samples: Some(samples),
                capacity: None,
                timestamp: unix_seconds(*timestamp),
            }),
            OutputFormat::Table | OutputFormat::Pretty => {
                println!(
                    "samples channel={} count={} first={}",
                    channel,
                    samples.len(),
                    samples.first().map(|s| s.to_string()).unwrap_or_default()
                );
            }
        },
        SinkEvent::CapacityHint { channel, capacity } => match format {
            OutputFormat::Json => print_json(&EventOutput {
                kind: "capacity-hint",
                channel,
                samples: None,
                capacity: Some(*capacity),
                timestamp: now_unix_seconds(),
            }),
            OutputFormat::Table | OutputFormat::Pretty => {
                println!("capacity-hint channel={channel} capacity={capacity}");
            }
        },
    }
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    device: &'a str,
    port: u16,
    channels: &'a [&'a str],
}

/// Announce the advertised port and registered channels at serve startup.
pub fn print_listening(device: &str, port: u16, channels: &[&str], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ListeningOutput {
            device,
            port,
            channels,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "PORT", "CHANNELS"])
                .add_row(vec![
                    device.to_string(),
                    port.to_string(),
                    channels.join(", "),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("device={device} port={port} channels={}", channels.join(","));
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn unix_seconds(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

fn now_unix_seconds() -> String {
    unix_seconds(SystemTime::now())
}
