use telemux_demux::Frame;
use telemux_transport::Producer;

use crate::cmd::SendArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args)?;

    let mut producer =
        Producer::connect(&args.addr).map_err(|err| transport_error("connect failed", err))?;
    producer
        .request_acked(&frame.encode())
        .map_err(|err| transport_error("send failed", err))?;

    match format {
        OutputFormat::Json => println!(r#"{{"acked":true}}"#),
        OutputFormat::Table | OutputFormat::Pretty => println!("acked"),
    }

    Ok(SUCCESS)
}

fn build_frame(args: &SendArgs) -> CliResult<Frame> {
    if let Some(capacity) = args.max_points {
        return Ok(Frame::CapacityUpdate {
            channels: args.channels.clone(),
            capacity,
        });
    }

    let payload = args
        .data
        .clone()
        .ok_or_else(|| CliError::new(USAGE, "either --data or --max-points is required"))?;
    if payload.is_empty() {
        return Err(CliError::new(USAGE, "--data must name at least one sample"));
    }
    if payload.len() % args.channels.len() != 0 {
        return Err(CliError::new(
            USAGE,
            format!(
                "{} samples cannot be interleaved across {} channels",
                payload.len(),
                args.channels.len()
            ),
        ));
    }

    Ok(Frame::Samples {
        channels: args.channels.clone(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::SendArgs;

    fn args(channels: &[&str], data: Option<Vec<f32>>, max_points: Option<i64>) -> SendArgs {
        SendArgs {
            addr: "127.0.0.1:0".to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            data,
            max_points,
        }
    }

    #[test]
    fn builds_a_sample_frame() {
        let frame = build_frame(&args(&["a", "b"], Some(vec![1.0, 2.0, 3.0, 4.0]), None)).unwrap();
        assert!(matches!(frame, Frame::Samples { ref payload, .. } if payload.len() == 4));
    }

    #[test]
    fn builds_a_capacity_frame() {
        let frame = build_frame(&args(&["a"], None, Some(500))).unwrap();
        assert_eq!(
            frame,
            Frame::CapacityUpdate {
                channels: vec!["a".into()],
                capacity: 500,
            }
        );
    }

    #[test]
    fn rejects_indivisible_data() {
        let err = build_frame(&args(&["a", "b"], Some(vec![1.0, 2.0, 3.0]), None)).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn requires_a_payload_flag() {
        let err = build_frame(&args(&["a"], None, None)).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
