//! Telemetry sessions: the producer loop and what consumers read.
//!
//! A [`Session`] owns one byte source and runs
//! synchronizer → decoder → mapper → cache until it is cancelled or the
//! source closes. Consumers share the [`LatestValueCache`] and poll
//! [`LatestValueCache::get_all`] or wait on [`LatestValueCache::subscribe`];
//! each mapped sample is also handed to any registered [`SampleSink`].

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod session;
pub mod sink;

pub use cache::{CacheSnapshot, LatestValueCache, STATUS_KEY};
pub use config::{HealthConfig, SessionConfig, SessionMeta};
pub use error::{Result, SessionError, SinkError};
pub use health::{LinkBadge, LinkHealthClassifier, LinkStatus};
pub use session::{Session, SessionEnd, SessionHandle, SessionReport};
pub use sink::{ChannelSink, JsonLinesSink, SampleSink};
pub use tokio_util::sync::CancellationToken;
