use std::io::Write;
use std::sync::mpsc::{SyncSender, TrySendError};

use serde::Serialize;
use telelink_schema::SemanticSample;

use crate::config::SessionMeta;
use crate::error::SinkError;

/// Receives each mapped sample, once per frame.
///
/// Called from the producer loop, so implementations must not block for
/// long. Errors are logged and counted by the session; they never stop
/// reception.
pub trait SampleSink: Send {
    fn publish(&mut self, sample: &SemanticSample) -> Result<(), SinkError>;

    /// Called once when the session ends.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<T: SampleSink + ?Sized> SampleSink for Box<T> {
    fn publish(&mut self, sample: &SemanticSample) -> Result<(), SinkError> {
        (**self).publish(sample)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

#[derive(Serialize)]
struct Line<'a> {
    #[serde(flatten)]
    meta: &'a SessionMeta,
    #[serde(flatten)]
    sample: &'a SemanticSample,
}

/// Writes one JSON object per sample, newline-delimited.
///
/// ```text
/// {"driver":"kim","channel_key":"0x640","channel_name":"ACCUMULATOR","fields":{...},"sequence":7,"derived_at":1700000000123}
/// ```
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    meta: SessionMeta,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_meta(writer, SessionMeta::default())
    }

    pub fn with_meta(writer: W, meta: SessionMeta) -> Self {
        Self {
            writer,
            meta,
            written: 0,
        }
    }

    /// Lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SampleSink for JsonLinesSink<W> {
    fn publish(&mut self, sample: &SemanticSample) -> Result<(), SinkError> {
        let line = Line {
            meta: &self.meta,
            sample,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.written = self.written.saturating_add(1);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Hands samples to another thread over a bounded queue without blocking.
///
/// A full queue drops the sample and reports [`SinkError::Full`].
#[derive(Debug)]
pub struct ChannelSink {
    tx: SyncSender<SemanticSample>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: SyncSender<SemanticSample>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Samples dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SampleSink for ChannelSink {
    fn publish(&mut self, sample: &SemanticSample) -> Result<(), SinkError> {
        match self.tx.try_send(sample.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped = self.dropped.saturating_add(1);
                Err(SinkError::Full)
            }
            Err(TrySendError::Disconnected(_)) => Err(SinkError::Disconnected),
        }
    }
}
