use std::fmt::Write as _;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use telelink_schema::SemanticSample;
use telelink_session::{CacheSnapshot, LinkBadge, LinkStatus, SessionReport};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SampleOutput<'a> {
    #[serde(flatten)]
    sample: &'a SemanticSample,
    link: LinkBadge,
}

pub fn print_sample(sample: &SemanticSample, link: &LinkStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SampleOutput {
                sample,
                link: link.badge,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "NAME", "SEQ", "FIELDS", "LINK"])
                .add_row(vec![
                    sample.channel_key.clone(),
                    channel_name(sample).to_string(),
                    sequence(sample),
                    fields_inline(sample),
                    link.badge.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} seq={} {} [{}]",
                sample.channel_key,
                channel_name(sample),
                sequence(sample),
                fields_inline(sample),
                link.badge
            );
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    frames_received: u64,
    checksum_failures: u64,
    length_failures: u64,
    short_reads: u64,
    decode_failures: u64,
    timeouts: u64,
    bytes_discarded: u64,
    samples: u64,
    unknown_samples: u64,
    merges: u64,
    sink_failures: u64,
    elapsed_ms: u64,
}

impl From<&SessionReport> for StatsOutput {
    fn from(report: &SessionReport) -> Self {
        Self {
            frames_received: report.frames.frames_received,
            checksum_failures: report.frames.checksum_failures,
            length_failures: report.frames.length_failures,
            short_reads: report.frames.short_reads,
            decode_failures: report.frames.decode_failures,
            timeouts: report.frames.timeouts,
            bytes_discarded: report.frames.bytes_discarded,
            samples: report.samples,
            unknown_samples: report.unknown_samples,
            merges: report.merges,
            sink_failures: report.sink_failures,
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    #[serde(flatten)]
    snapshot: &'a CacheSnapshot,
    stats: StatsOutput,
    ended_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<&'a str>,
}

/// Final cache contents plus session counters.
pub fn print_snapshot(snapshot: &CacheSnapshot, report: &SessionReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SnapshotOutput {
                snapshot,
                stats: StatsOutput::from(report),
                ended_by: report.ended_by.to_string(),
                driver: report.meta.driver.as_deref(),
                track: report.meta.track.as_deref(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut channels = Table::new();
            channels
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "NAME", "SEQ", "FIELDS"]);
            for sample in snapshot.samples.values() {
                channels.add_row(vec![
                    sample.channel_key.clone(),
                    channel_name(sample).to_string(),
                    sequence(sample),
                    fields_inline(sample),
                ]);
            }
            println!("{channels}");

            let mut stats = Table::new();
            stats
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"]);
            for (name, value) in stats_rows(report) {
                stats.add_row(vec![name.to_string(), value]);
            }
            stats.add_row(vec!["link".to_string(), snapshot.status.to_string()]);
            println!("{stats}");
        }
        OutputFormat::Pretty => {
            for sample in snapshot.samples.values() {
                println!(
                    "{} {} seq={} {}",
                    sample.channel_key,
                    channel_name(sample),
                    sequence(sample),
                    fields_inline(sample)
                );
            }
            let summary: Vec<String> = stats_rows(report)
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("{}", summary.join(" "));
            println!("link: {}", snapshot.status);
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    channel: String,
    layout: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u16>,
    frame: String,
}

pub fn print_encoded(
    channel_key: String,
    layout: &str,
    sequence: Option<u16>,
    frame: &[u8],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                channel: channel_key,
                layout,
                sequence,
                frame: hex(frame, ""),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex(frame, " ")),
    }
}

fn stats_rows(report: &SessionReport) -> Vec<(&'static str, String)> {
    let stats = StatsOutput::from(report);
    vec![
        ("frames", stats.frames_received.to_string()),
        ("checksum_failures", stats.checksum_failures.to_string()),
        ("length_failures", stats.length_failures.to_string()),
        ("short_reads", stats.short_reads.to_string()),
        ("decode_failures", stats.decode_failures.to_string()),
        ("bytes_discarded", stats.bytes_discarded.to_string()),
        ("samples", stats.samples.to_string()),
        ("unknown_samples", stats.unknown_samples.to_string()),
        ("sink_failures", stats.sink_failures.to_string()),
        ("ended_by", report.ended_by.to_string()),
    ]
}

fn channel_name(sample: &SemanticSample) -> &'static str {
    sample.channel_name.unwrap_or("UNKNOWN")
}

fn sequence(sample: &SemanticSample) -> String {
    sample
        .sequence
        .map(|seq| seq.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fields_inline(sample: &SemanticSample) -> String {
    let mut out = String::new();
    for (i, (name, value)) in sample.fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{name}={value:.2}");
    }
    out
}

pub fn hex(bytes: &[u8], sep: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(sep)
}
