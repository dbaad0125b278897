use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use telelink_frame::{FrameStats, FRAME_LEN};

use crate::config::HealthConfig;

/// Coarse link trust level shown next to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkBadge {
    /// Valid frames are arriving.
    Live,
    /// Nothing valid within the recency window.
    Stale,
    /// Diagnostic mode with synthetic data; set explicitly, never derived.
    Test,
    /// Bytes arrive but mostly fail validation (wrong baud rate, wrong protocol).
    Bad,
}

impl LinkBadge {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkBadge::Live => "LIVE",
            LinkBadge::Stale => "STALE",
            LinkBadge::Test => "TEST",
            LinkBadge::Bad => "BAD",
        }
    }

    /// Whether displayed values may be shown as current.
    ///
    /// Consumers freeze presentation for STALE and BAD.
    pub fn is_trustworthy(self) -> bool {
        matches!(self, LinkBadge::Live | LinkBadge::Test)
    }
}

impl fmt::Display for LinkBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub badge: LinkBadge,
    pub reason: String,
}

impl LinkStatus {
    pub fn new(badge: LinkBadge, reason: impl Into<String>) -> Self {
        Self {
            badge,
            reason: reason.into(),
        }
    }

    /// Status before any evaluation has run.
    pub fn waiting() -> Self {
        Self::new(LinkBadge::Stale, "waiting for first frame")
    }

    pub fn diagnostic() -> Self {
        Self::new(LinkBadge::Test, "diagnostic mode")
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::waiting()
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.badge, self.reason)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tick {
    valid: u64,
    failures: u64,
    discarded: u64,
}

/// Derives a [`LinkStatus`] from synchronizer counters on a fixed cadence.
///
/// Each evaluation records how many frames validated and how many failed
/// since the previous one. Over the last `window_ticks` evaluations:
/// - BAD when failures reach `min_failures` and make up at least
///   `bad_ratio` of validation outcomes
/// - BAD when discarded noise reaches `min_noise_bytes` and makes up at
///   least `bad_ratio` of the bytes seen (a misconfigured baud rate rarely
///   produces a start marker at all)
/// - STALE when no valid frame arrived within `stale_after`
/// - LIVE otherwise
///
/// Timeouts and short reads are not validation outcomes; a quiet link goes
/// STALE, never BAD.
#[derive(Debug)]
pub struct LinkHealthClassifier {
    config: HealthConfig,
    window: VecDeque<Tick>,
    last_totals: Tick,
    last_eval: Option<Instant>,
    started: Instant,
    status: LinkStatus,
}

impl LinkHealthClassifier {
    pub fn new(config: HealthConfig, started: Instant) -> Self {
        let capacity = config.window_ticks.max(1);
        Self {
            config,
            window: VecDeque::with_capacity(capacity),
            last_totals: Tick::default(),
            last_eval: None,
            started,
            status: LinkStatus::waiting(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Most recent classification.
    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    /// Whether `interval` has elapsed since the last evaluation.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_eval {
            Some(at) => now.saturating_duration_since(at) >= self.config.interval,
            None => true,
        }
    }

    /// Evaluate if due. Returns the new status only when the badge or
    /// reason changed.
    pub fn poll(&mut self, stats: &FrameStats, now: Instant) -> Option<LinkStatus> {
        if !self.is_due(now) {
            return None;
        }
        let previous = self.status.clone();
        let current = self.evaluate(stats, now);
        (current != previous).then_some(current)
    }

    /// Take one evaluation tick unconditionally.
    pub fn evaluate(&mut self, stats: &FrameStats, now: Instant) -> LinkStatus {
        let totals = Tick {
            valid: stats.frames_received,
            failures: stats.validation_failures(),
            discarded: stats.bytes_discarded,
        };
        let tick = Tick {
            valid: totals.valid.saturating_sub(self.last_totals.valid),
            failures: totals.failures.saturating_sub(self.last_totals.failures),
            discarded: totals.discarded.saturating_sub(self.last_totals.discarded),
        };
        self.last_totals = totals;
        self.last_eval = Some(now);

        let capacity = self.config.window_ticks.max(1);
        while self.window.len() >= capacity {
            self.window.pop_front();
        }
        self.window.push_back(tick);

        let next = self.classify(stats, now);
        self.log_transition(&next);
        self.status = next.clone();
        next
    }

    fn classify(&self, stats: &FrameStats, now: Instant) -> LinkStatus {
        let sum = self.window.iter().fold(Tick::default(), |acc, tick| Tick {
            valid: acc.valid.saturating_add(tick.valid),
            failures: acc.failures.saturating_add(tick.failures),
            discarded: acc.discarded.saturating_add(tick.discarded),
        });

        let outcomes = sum.valid.saturating_add(sum.failures);
        if sum.failures >= self.config.min_failures
            && outcomes > 0
            && sum.failures as f64 / outcomes as f64 >= self.config.bad_ratio
        {
            return LinkStatus::new(
                LinkBadge::Bad,
                format!(
                    "{} of {outcomes} recent frames failed validation",
                    sum.failures
                ),
            );
        }

        let framed = sum.valid.saturating_mul(FRAME_LEN as u64);
        let seen = sum.discarded.saturating_add(framed);
        if sum.discarded >= self.config.min_noise_bytes
            && sum.discarded as f64 / seen as f64 >= self.config.bad_ratio
        {
            return LinkStatus::new(
                LinkBadge::Bad,
                format!("{} recent bytes carried no start marker", sum.discarded),
            );
        }

        match stats.since_last_valid(now) {
            Some(quiet) if quiet <= self.config.stale_after => {
                LinkStatus::new(LinkBadge::Live, "receiving valid frames")
            }
            Some(quiet) => LinkStatus::new(
                LinkBadge::Stale,
                format!("no valid frame for {}", format_duration(quiet)),
            ),
            None => {
                let waited = now.saturating_duration_since(self.started);
                if waited <= self.config.stale_after {
                    LinkStatus::waiting()
                } else {
                    LinkStatus::new(
                        LinkBadge::Stale,
                        format!("no valid frame in {}", format_duration(waited)),
                    )
                }
            }
        }
    }

    fn log_transition(&self, next: &LinkStatus) {
        if next.badge == self.status.badge {
            return;
        }
        match next.badge {
            LinkBadge::Stale | LinkBadge::Bad => tracing::warn!(
                from = %self.status.badge,
                to = %next.badge,
                reason = %next.reason,
                "link degraded"
            ),
            LinkBadge::Live | LinkBadge::Test => tracing::info!(
                from = %self.status.badge,
                to = %next.badge,
                "link healthy"
            ),
        }
    }
}

fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
