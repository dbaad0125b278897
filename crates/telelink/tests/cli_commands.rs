#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use telelink::frame::{PayloadLayout, KNOWN_CHANNELS};
use telelink::simulate::Simulator;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/telelink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn telelink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_telelink"));
    cmd.arg("--log-level").arg("error").env_remove("TELELINK_LAYOUT");
    cmd
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child status should be readable").is_some() {
            return child.wait_with_output().expect("child output should be readable");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("command did not finish within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn simulate_then_replay_fills_every_channel() {
    let dir = unique_temp_dir("replay");
    let capture = dir.join("capture.bin");
    let record = dir.join("samples.jsonl");

    let status = telelink()
        .args(["simulate", "--frames", "45", "--noise", "3", "-o"])
        .arg(&capture)
        .status()
        .expect("simulate should run");
    assert!(status.success());
    let size = std::fs::metadata(&capture).expect("capture should exist").len();
    assert_eq!(size, 45 * (36 + 3));

    let output = telelink()
        .args(["--format", "json", "replay"])
        .arg(&capture)
        .args(["--driver", "kim", "--record"])
        .arg(&record)
        .output()
        .expect("replay should run");
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("replay should emit json");
    let samples = report["samples"].as_object().expect("samples should be an object");
    for id in KNOWN_CHANNELS {
        assert!(
            samples.contains_key(&format!("{id:#X}")),
            "missing channel {id:#X}"
        );
    }
    assert_eq!(report["samples"]["0x600"]["channel_name"], "POWER_BUS");
    assert_eq!(report["stats"]["frames_received"], 45);
    assert_eq!(report["stats"]["checksum_failures"], 0);
    assert_eq!(report["stats"]["bytes_discarded"], 45 * 3);
    assert_eq!(report["status"]["badge"], "LIVE");
    assert_eq!(report["ended_by"], "source closed");
    assert_eq!(report["driver"], "kim");

    let lines = std::fs::read_to_string(&record).expect("record file should exist");
    assert_eq!(lines.lines().count(), 45);
    let first: serde_json::Value =
        serde_json::from_str(lines.lines().next().expect("at least one line"))
            .expect("record line should be json");
    assert_eq!(first["driver"], "kim");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn legacy_capture_replays_with_legacy_layout() {
    let dir = unique_temp_dir("legacy");
    let capture = dir.join("legacy.bin");

    let status = telelink()
        .args(["simulate", "--frames", "9", "--layout", "legacy", "-o"])
        .arg(&capture)
        .status()
        .expect("simulate should run");
    assert!(status.success());

    let output = telelink()
        .args(["--format", "json", "replay"])
        .arg(&capture)
        .args(["--layout", "legacy"])
        .output()
        .expect("replay should run");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("replay should emit json");
    assert_eq!(report["samples"]["0x600"]["channel_name"], "IMU_REAR");
    assert!(report["samples"]["0x600"].get("sequence").is_none());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn replay_without_frames_is_data_invalid() {
    let dir = unique_temp_dir("empty");
    let capture = dir.join("noise.bin");
    std::fs::write(&capture, [0x00u8, 0xAA, 0x12, 0x55, 0x20, 0xFF]).expect("capture writable");

    let output = telelink()
        .args(["--format", "json", "replay"])
        .arg(&capture)
        .output()
        .expect("replay should run");
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn replay_missing_file_fails() {
    let output = telelink()
        .args(["replay", "/tmp/telelink-does-not-exist.bin"])
        .output()
        .expect("replay should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn encode_prints_a_complete_frame() {
    let output = telelink()
        .args([
            "--format", "json", "encode", "-c", "0x640", "--seq", "7", "-v", "12.5", "-v", "3.7",
        ])
        .output()
        .expect("encode should run");
    assert!(output.status.success());

    let encoded: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("encode should emit json");
    let frame = encoded["frame"].as_str().expect("frame should be a string");
    assert_eq!(frame.len(), 36 * 2);
    assert!(frame.starts_with("aa5520400607"));
    assert_eq!(encoded["channel"], "0x640");
    assert_eq!(encoded["sequence"], 7);
}

#[test]
fn encode_rejects_too_many_values() {
    let mut cmd = telelink();
    cmd.args(["encode", "-c", "0x640"]);
    for _ in 0..8 {
        cmd.args(["-v", "1"]);
    }
    let output = cmd.output().expect("encode should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn listen_prints_samples_from_bridge() {
    let bridge = TcpListener::bind("127.0.0.1:0").expect("bridge should bind");
    let addr = bridge.local_addr().expect("bridge should have an address");

    let server = thread::spawn(move || {
        let (mut stream, _) = bridge.accept().expect("listen should connect");
        let mut sim = Simulator::new(PayloadLayout::New);
        for frame in sim.by_ref().take(18) {
            stream.write_all(&frame).expect("frame should send");
        }
        stream.flush().expect("flush should succeed");
        // Hold the connection until the client hangs up.
        let mut sink = [0u8; 16];
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let _ = stream.read(&mut sink);
    });

    let child = telelink()
        .args(["--format", "json", "listen"])
        .arg(addr.to_string())
        .args(["--count", "3", "--read-timeout", "100ms"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");

    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert!(
        output.status.success(),
        "listen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["channel_key"], "0x600");
    assert_eq!(lines[1]["channel_key"], "0x610");
    assert!(lines.iter().all(|line| line.get("link").is_some()));

    server.join().expect("bridge thread should not panic");
}

#[test]
fn listen_refused_connection_is_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("ephemeral port should bind");

    let output = telelink()
        .arg("listen")
        .arg(addr.to_string())
        .output()
        .expect("listen should run");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_reports_package_version() {
    let output = telelink().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("telelink {}", env!("CARGO_PKG_VERSION")));
}
