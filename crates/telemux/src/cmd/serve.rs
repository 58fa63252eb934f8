use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use telemux_demux::{Demultiplexer, DemuxServer, DeviceDescriptor, QueuedSink, SinkEvent};
use telemux_transport::StopHandle;

use crate::cmd::ServeArgs;
use crate::exit::{descriptor_error, server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, print_listening, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = DeviceDescriptor::from_path(&args.descriptor)
        .map_err(|err| descriptor_error("descriptor load failed", err))?;

    let server = match args.addr {
        Some(addr) => DemuxServer::bind_with_config(addr, Default::default()),
        None => DemuxServer::bind(),
    }
    .map_err(|err| server_error("bind failed", err))?;

    let (tx, events) = mpsc::channel();
    server.register_descriptor(&descriptor, |name| {
        Box::new(QueuedSink::new(name, tx.clone()))
    });
    drop(tx);

    let channels: Vec<&str> = descriptor
        .analog_inputs()
        .iter()
        .map(String::as_str)
        .collect();
    print_listening(descriptor.device_name(), server.port(), &channels, format);

    install_ctrlc_handler(server.stop_handle())?;

    // Sink events drain on this dedicated consumer thread, never on the
    // receive thread.
    let consumer = spawn_consumer(
        events,
        server.demultiplexer(),
        server.stop_handle(),
        args.frames,
        args.quiet,
        format,
    );

    let stop = server.stop_handle();
    let result = server
        .serve()
        .map_err(|err| server_error("serve failed", err));
    // However serve ended, release the consumer thread before joining it.
    stop.stop();
    drop(server);
    consumer
        .join()
        .map_err(|_| CliError::new(INTERNAL, "event consumer thread panicked"))?;
    result?;

    Ok(SUCCESS)
}

fn spawn_consumer(
    events: mpsc::Receiver<SinkEvent>,
    demux: Arc<Mutex<Demultiplexer>>,
    stop: StopHandle,
    frame_limit: Option<usize>,
    quiet: bool,
    format: OutputFormat,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                if !quiet {
                    print_event(&event, format);
                }
                if let Some(limit) = frame_limit {
                    let frames = match demux.lock() {
                        Ok(demux) => demux.sample_frames(),
                        Err(poisoned) => poisoned.into_inner().sample_frames(),
                    };
                    if frames >= limit as u64 {
                        stop.stop();
                        return;
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if stop.is_stopped() {
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    })
}

fn install_ctrlc_handler(stop: StopHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.stop();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
