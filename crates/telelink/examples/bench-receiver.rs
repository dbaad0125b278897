//! Bench receiver: a simulated bridge feeding a live session over loopback TCP.
//!
//! Run with:
//!   cargo run --example bench-receiver
//!
//! Prints the link badge and cached channel count whenever the cache changes,
//! then the final cache once the simulated bridge hangs up.

use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use telelink::frame::PayloadLayout;
use telelink::session::{Session, SessionConfig};
use telelink::simulate::Simulator;
use telelink::transport::TcpSource;

const FRAMES: usize = 180;
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bridge = TcpListener::bind("127.0.0.1:0")?;
    let addr = bridge.local_addr()?;

    let server = thread::spawn(move || -> std::io::Result<()> {
        let (mut stream, peer) = bridge.accept()?;
        eprintln!("[bridge] receiver connected from {peer}");
        for (i, frame) in Simulator::new(PayloadLayout::New).take(FRAMES).enumerate() {
            // Every 40th frame gets a flipped checksum.
            if i % 40 == 39 {
                let mut bad = frame.to_vec();
                if let Some(last) = bad.last_mut() {
                    *last ^= 0xFF;
                }
                stream.write_all(&bad)?;
            } else {
                stream.write_all(&frame)?;
            }
            thread::sleep(FRAME_INTERVAL);
        }
        eprintln!("[bridge] done");
        Ok(())
    });

    let source = TcpSource::connect(addr, Duration::from_millis(100))?;
    let handle = Session::new(source, SessionConfig::default()).spawn()?;
    let cache = handle.cache();
    let mut changes = cache.subscribe();

    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(250));
        if changes.has_changed().unwrap_or(false) {
            let version = *changes.borrow_and_update();
            eprintln!(
                "[receiver] v{version} channels={} link={}",
                cache.len(),
                cache.link_status()
            );
        }
    }

    let report = handle.join()?;
    server
        .join()
        .map_err(|_| "bridge thread panicked")??;

    let snapshot = cache.get_all();
    for (key, sample) in &snapshot.samples {
        println!("{key} {}", serde_json::to_string(&sample.fields)?);
    }
    println!(
        "frames={} checksum_failures={} ended_by={} link={}",
        report.frames.frames_received,
        report.frames.checksum_failures,
        report.ended_by,
        snapshot.status
    );
    Ok(())
}
