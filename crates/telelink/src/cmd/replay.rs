use std::fs::File;

use telelink_session::{CancellationToken, JsonLinesSink, Session, SessionEnd};
use telelink_transport::StreamSource;

use crate::cmd::{install_ctrlc_handler, open_record, ReplayArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_snapshot, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.to_config()?;
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("open {}", args.file.display()), err))?;

    let mut session = Session::new(StreamSource::new(file), config);
    if let Some(path) = &args.session.record {
        let writer = open_record(path)?;
        session.add_sink(Box::new(JsonLinesSink::with_meta(
            writer,
            args.session.meta(),
        )));
    }

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;
    let report = session.run(&cancel);
    print_snapshot(&session.cache().get_all(), &report, format);

    if let SessionEnd::TransportFailed(err) = &report.ended_by {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!("read {} failed: {err}", args.file.display()),
        ));
    }
    if report.frames.frames_received == 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames in {}", args.file.display()),
        ));
    }
    Ok(SUCCESS)
}
