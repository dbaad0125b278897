use std::fs::File;
use std::io::{self, BufWriter, Write};

use bytes::{BufMut, BytesMut};
use telelink::simulate::Simulator;
use telelink_frame::{FRAME_LEN, SOF1};

use crate::cmd::SimulateArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let mut sim = Simulator::new(args.layout);
    let mut buf = BytesMut::with_capacity(FRAME_LEN + args.noise);
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .map_err(|err| io_error(&format!("create {}", path.display()), err))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for _ in 0..args.frames {
        buf.clear();
        put_noise(&mut buf, args.noise);
        sim.write_frame(&mut buf)
            .map_err(|err| frame_error("encode failed", err))?;
        out.write_all(&buf)
            .map_err(|err| io_error("write failed", err))?;
    }
    out.flush().map_err(|err| io_error("flush failed", err))?;

    tracing::info!(
        frames = sim.produced(),
        layout = sim.format().as_str(),
        noise = args.noise,
        "simulation written"
    );
    Ok(SUCCESS)
}

/// Junk that starts with a stray start byte, so the receiver has to
/// resynchronize rather than skip a clean gap.
fn put_noise(buf: &mut BytesMut, len: usize) {
    if len == 0 {
        return;
    }
    buf.put_u8(SOF1);
    for i in 1..len {
        buf.put_u8(0x11u8.wrapping_mul(i as u8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_has_requested_length() {
        let mut buf = BytesMut::new();
        put_noise(&mut buf, 5);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], SOF1);

        buf.clear();
        put_noise(&mut buf, 0);
        assert!(buf.is_empty());
    }
}
