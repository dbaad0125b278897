use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::time::Duration;

use telelink_session::{
    CancellationToken, ChannelSink, JsonLinesSink, Session, SessionEnd, SessionReport,
};
use telelink_transport::TcpSource;

use crate::cmd::{install_ctrlc_handler, open_record, parse_duration, ListenArgs};
use crate::exit::{session_error, transport_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_sample, OutputFormat};

/// Samples buffered between the producer thread and stdout.
const PRINT_QUEUE: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.to_config()?;
    let read_timeout = parse_duration(&args.read_timeout)?;

    let source = TcpSource::connect(args.addr.as_str(), read_timeout)
        .map_err(|err| transport_error("connect failed", err))?;
    tracing::info!(peer = %source.peer_addr(), "listening");

    let (tx, rx) = sync_channel(PRINT_QUEUE);
    let mut session = Session::new(source, config).with_sink(ChannelSink::new(tx));
    if let Some(path) = &args.session.record {
        let writer = open_record(path)?;
        session.add_sink(Box::new(JsonLinesSink::with_meta(
            writer,
            args.session.meta(),
        )));
    }

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;
    let handle = session
        .spawn_with_token(cancel.clone())
        .map_err(|err| session_error("session start failed", err))?;
    let cache = handle.cache();

    let mut printed = 0usize;
    while !cancel.is_cancelled() {
        let sample = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(sample) => sample,
            Err(RecvTimeoutError::Timeout) => continue,
            // The session dropped its sinks on the way out.
            Err(RecvTimeoutError::Disconnected) => break,
        };

        print_sample(&sample, &cache.link_status(), format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    let report = handle
        .stop()
        .map_err(|err| session_error("session stop failed", err))?;
    exit_code(&report)
}

fn exit_code(report: &SessionReport) -> CliResult<i32> {
    match &report.ended_by {
        SessionEnd::TransportFailed(err) => Err(CliError::new(
            TRANSPORT_ERROR,
            format!("bridge connection failed: {err}"),
        )),
        SessionEnd::Cancelled | SessionEnd::SourceClosed => Ok(SUCCESS),
    }
}
