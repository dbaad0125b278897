use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use telelink_frame::PayloadLayout;
use telelink_session::{CancellationToken, HealthConfig, SessionConfig, SessionMeta};

use crate::exit::{io_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod listen;
pub mod replay;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a TCP serial bridge and print decoded samples.
    Listen(ListenArgs),
    /// Decode a captured byte stream and print the final cache.
    Replay(ReplayArgs),
    /// Emit synthetic frames for bench testing.
    Simulate(SimulateArgs),
    /// Build one frame and print it as hex.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Simulate(args) => simulate::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that runs a session.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Payload layout used by the transmitters (new, legacy, auto).
    #[arg(long, env = "TELELINK_LAYOUT", default_value = "new")]
    pub layout: PayloadLayout,
    /// Time without a valid frame before the link reads STALE (e.g. 1500ms, 2s).
    #[arg(long, default_value = "1500ms")]
    pub stale_after: String,
    /// How often link health is re-evaluated (e.g. 500ms).
    #[arg(long, default_value = "500ms")]
    pub health_interval: String,
    /// Mark the link TEST regardless of statistics (synthetic data).
    #[arg(long)]
    pub diagnostic: bool,
    /// Do not update legacy-named channels from the power-bus channel.
    #[arg(long)]
    pub no_aliases: bool,
    /// Driver label attached to recorded samples.
    #[arg(long)]
    pub driver: Option<String>,
    /// Track label attached to recorded samples.
    #[arg(long)]
    pub track: Option<String>,
    /// Append every sample as a JSON line to this file.
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,
}

impl SessionArgs {
    pub fn to_config(&self) -> CliResult<SessionConfig> {
        let health = HealthConfig {
            interval: parse_duration(&self.health_interval)?,
            stale_after: parse_duration(&self.stale_after)?,
            ..HealthConfig::default()
        };
        let mut config = SessionConfig::default()
            .with_layout(self.layout)
            .with_health(health)
            .with_meta(self.meta())
            .diagnostic(self.diagnostic);
        config.mapper.compat_aliases = !self.no_aliases;
        Ok(config)
    }

    pub fn meta(&self) -> SessionMeta {
        SessionMeta {
            driver: self.driver.clone(),
            track: self.track.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Bridge address, e.g. 192.168.4.1:4000.
    pub addr: String,
    /// Read timeout on the bridge socket (e.g. 200ms, 1s).
    #[arg(long, default_value = "200ms")]
    pub read_timeout: String,
    /// Exit after printing N samples.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file holding raw link bytes.
    pub file: PathBuf,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of frames to emit.
    #[arg(long, default_value = "90")]
    pub frames: u64,
    /// Payload layout to generate (auto generates new).
    #[arg(long, default_value = "new")]
    pub layout: PayloadLayout,
    /// Junk bytes inserted between frames, to exercise resynchronization.
    #[arg(long, default_value = "0")]
    pub noise: usize,
    /// Write to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Channel id, hex (0x640) or decimal.
    #[arg(long, short = 'c')]
    pub channel: String,
    /// Sequence number (new layout only).
    #[arg(long, default_value = "0")]
    pub seq: u16,
    /// Field values in wire order; up to seven, missing ones are zero.
    #[arg(long = "value", short = 'v', allow_negative_numbers = true)]
    pub values: Vec<f32>,
    /// Payload layout to encode with.
    #[arg(long, default_value = "new")]
    pub layout: PayloadLayout,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

/// Cancel `token` on Ctrl-C.
pub fn install_ctrlc_handler(token: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || token.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

/// Open `path` for appending JSON lines.
pub fn open_record(path: &Path) -> CliResult<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
    Ok(BufWriter::new(file))
}
