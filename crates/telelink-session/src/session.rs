use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use telelink_frame::{
    FrameError, FrameStats, FrameSynchronizer, NormalizedRecord, PayloadDecoder, ValidPayload,
};
use telelink_schema::{SemanticMapper, SemanticSample};
use telelink_transport::ByteSource;
use tokio_util::sync::CancellationToken;

use crate::cache::LatestValueCache;
use crate::config::{SessionConfig, SessionMeta};
use crate::error::{Result, SessionError};
use crate::health::{LinkHealthClassifier, LinkStatus};
use crate::sink::SampleSink;

/// Why the producer loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The cancellation token fired.
    Cancelled,
    /// The byte source reached end of stream.
    SourceClosed,
    /// The byte source failed with something other than a timeout.
    TransportFailed(String),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Cancelled => f.write_str("cancelled"),
            SessionEnd::SourceClosed => f.write_str("source closed"),
            SessionEnd::TransportFailed(err) => write!(f, "transport failed: {err}"),
        }
    }
}

/// Summary returned when a session stops.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub frames: FrameStats,
    /// Samples written to the cache under their own channel key.
    pub samples: u64,
    /// Of those, samples for channels outside the table.
    pub unknown_samples: u64,
    /// Alias merges written to legacy-named keys.
    pub merges: u64,
    pub sink_failures: u64,
    pub link: LinkStatus,
    pub ended_by: SessionEnd,
    pub meta: SessionMeta,
    pub elapsed: Duration,
}

/// One reception session over one byte source.
///
/// Owns the source, the synchronizer's counters, and the mapper state for
/// its lifetime. The cache is shared so consumers can keep reading it after
/// the session stops.
pub struct Session<S> {
    sync: FrameSynchronizer<S>,
    decoder: PayloadDecoder,
    mapper: SemanticMapper,
    cache: Arc<LatestValueCache>,
    sinks: Vec<Box<dyn SampleSink>>,
    config: SessionConfig,
    samples: u64,
    unknown_samples: u64,
    merges: u64,
    sink_failures: u64,
}

impl<S: ByteSource> Session<S> {
    pub fn new(source: S, config: SessionConfig) -> Self {
        Self::with_cache(source, config, Arc::new(LatestValueCache::new()))
    }

    /// Create a session that writes into an existing cache.
    pub fn with_cache(source: S, config: SessionConfig, cache: Arc<LatestValueCache>) -> Self {
        cache.set_diagnostic(config.diagnostic);
        Self {
            sync: FrameSynchronizer::new(source),
            decoder: PayloadDecoder::new(config.layout),
            mapper: SemanticMapper::new(config.mapper),
            cache,
            sinks: Vec::new(),
            config,
            samples: 0,
            unknown_samples: 0,
            merges: 0,
            sink_failures: 0,
        }
    }

    /// Register a sink for published samples.
    pub fn with_sink(mut self, sink: impl SampleSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn SampleSink>) {
        self.sinks.push(sink);
    }

    pub fn cache(&self) -> Arc<LatestValueCache> {
        Arc::clone(&self.cache)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &FrameStats {
        self.sync.stats()
    }

    /// Run the producer loop on the current thread until `cancel` fires or
    /// the source closes, then release the source.
    ///
    /// Blocks only inside a source read, which the source bounds with its
    /// own timeout. The token is checked once per iteration.
    pub fn run(&mut self, cancel: &CancellationToken) -> SessionReport {
        let started = Instant::now();
        let mut health = LinkHealthClassifier::new(self.config.health.clone(), started);
        self.cache.set_status(health.status().clone());

        tracing::info!(
            layout = %self.config.layout,
            diagnostic = self.config.diagnostic,
            driver = self.config.meta.driver.as_deref().unwrap_or("-"),
            track = self.config.meta.track.as_deref().unwrap_or("-"),
            "session started"
        );

        let ended_by = loop {
            if cancel.is_cancelled() {
                break SessionEnd::Cancelled;
            }

            match self.sync.next_payload() {
                Ok(payload) => self.handle_payload(&payload),
                Err(FrameError::Closed) => break SessionEnd::SourceClosed,
                Err(FrameError::Transport(err)) => {
                    tracing::warn!(error = %err, "transport failed");
                    break SessionEnd::TransportFailed(err.to_string());
                }
                // Counted by the synchronizer.
                Err(_) => {}
            }

            if let Some(status) = health.poll(self.sync.stats(), Instant::now()) {
                self.cache.set_status(status);
            }
        };

        // A replayed capture can finish inside one health interval.
        let last = health.evaluate(self.sync.stats(), Instant::now());
        self.cache.set_status(last);

        if let Err(err) = self.sync.close() {
            tracing::debug!(error = %err, "closing source failed");
        }
        for sink in &mut self.sinks {
            if let Err(err) = sink.flush() {
                self.sink_failures = self.sink_failures.saturating_add(1);
                tracing::warn!(error = %err, "sink flush failed");
            }
        }

        let report = self.report(self.cache.link_status(), ended_by, started.elapsed());
        tracing::info!(
            ended_by = %report.ended_by,
            frames = report.frames.frames_received,
            checksum_failures = report.frames.checksum_failures,
            length_failures = report.frames.length_failures,
            short_reads = report.frames.short_reads,
            samples = report.samples,
            sink_failures = report.sink_failures,
            "session stopped"
        );
        report
    }

    fn handle_payload(&mut self, payload: &ValidPayload) {
        let Some(record) = self.decoder.decode(payload.as_bytes()) else {
            self.sync.record_decode_failure();
            tracing::debug!("payload could not be decoded");
            return;
        };
        tracing::debug!(%record, "frame");
        self.apply(&record, SystemTime::now());
    }

    /// Map one record into the cache and publish it.
    fn apply(&mut self, record: &NormalizedRecord, at: SystemTime) {
        let mapped = self.mapper.map(record, at);
        let primary = mapped.primary;

        if primary.is_raw() {
            self.unknown_samples = self.unknown_samples.saturating_add(1);
        }
        if !primary.is_raw() || self.config.publish_unknown {
            self.publish(&primary);
        }

        let key = primary.channel_key.clone();
        match self.cache.upsert(key, primary) {
            Ok(_) => self.samples = self.samples.saturating_add(1),
            Err(err) => tracing::debug!(error = %err, "cache write rejected"),
        }
        for partial in mapped.merges {
            match self.cache.merge(partial) {
                Ok(_) => self.merges = self.merges.saturating_add(1),
                Err(err) => tracing::debug!(error = %err, "cache merge rejected"),
            }
        }
    }

    fn publish(&mut self, sample: &SemanticSample) {
        for sink in &mut self.sinks {
            if let Err(err) = sink.publish(sample) {
                self.sink_failures = self.sink_failures.saturating_add(1);
                if self.sink_failures == 1 {
                    tracing::warn!(
                        error = %err,
                        "sink rejected sample; further failures logged at debug"
                    );
                } else {
                    tracing::debug!(error = %err, "sink rejected sample");
                }
            }
        }
    }

    fn report(&self, link: LinkStatus, ended_by: SessionEnd, elapsed: Duration) -> SessionReport {
        SessionReport {
            frames: *self.sync.stats(),
            samples: self.samples,
            unknown_samples: self.unknown_samples,
            merges: self.merges,
            sink_failures: self.sink_failures,
            link,
            ended_by,
            meta: self.config.meta.clone(),
            elapsed,
        }
    }
}

impl<S: ByteSource + Send + 'static> Session<S> {
    /// Run the producer loop on a dedicated thread.
    pub fn spawn(self) -> Result<SessionHandle> {
        self.spawn_with_token(CancellationToken::new())
    }

    /// Run on a dedicated thread, stopping when `cancel` fires.
    pub fn spawn_with_token(mut self, cancel: CancellationToken) -> Result<SessionHandle> {
        let cache = self.cache();
        let token = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("telelink-session".to_string())
            .spawn(move || self.run(&token))
            .map_err(SessionError::Spawn)?;
        Ok(SessionHandle {
            cancel,
            cache,
            thread,
        })
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("layout", &self.config.layout)
            .field("sinks", &self.sinks.len())
            .field("samples", &self.samples)
            .finish_non_exhaustive()
    }
}

/// A session running on its own thread.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    cache: Arc<LatestValueCache>,
    thread: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn cache(&self) -> Arc<LatestValueCache> {
        Arc::clone(&self.cache)
    }

    /// Token that stops this session when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signal stop and wait for the producer to release the source.
    ///
    /// Returns after at most one source read timeout.
    pub fn stop(self) -> Result<SessionReport> {
        self.cancel.cancel();
        self.join()
    }

    /// Wait for the session to end on its own.
    pub fn join(self) -> Result<SessionReport> {
        self.thread.join().map_err(|_| SessionError::Panicked)
    }
}
