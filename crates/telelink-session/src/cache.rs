use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use telelink_schema::SemanticSample;
use tokio::sync::watch;

use crate::error::{Result, SessionError};
use crate::health::LinkStatus;

/// Key under which link status is reported alongside samples.
pub const STATUS_KEY: &str = "__STATUS__";

/// A consistent copy of the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSnapshot {
    pub samples: BTreeMap<String, SemanticSample>,
    pub status: LinkStatus,
    /// Cache version the snapshot was taken at.
    pub version: u64,
}

impl CacheSnapshot {
    pub fn get(&self, key: &str) -> Option<&SemanticSample> {
        self.samples.get(key)
    }
}

/// Latest sample per channel key, plus link status.
///
/// One writer, many readers. Each key holds an `Arc` that is replaced
/// whole, so a reader sees either the old sample or the new one, never a
/// mix. Nothing is evicted during a session.
///
/// Every write bumps a version counter that is also published on a
/// [`watch`] channel, so consumers can either poll [`version`](Self::version)
/// or await [`subscribe`](Self::subscribe).
#[derive(Debug)]
pub struct LatestValueCache {
    samples: RwLock<HashMap<String, Arc<SemanticSample>>>,
    status: RwLock<LinkStatus>,
    diagnostic: AtomicBool,
    version: AtomicU64,
    notify: watch::Sender<u64>,
}

impl Default for LatestValueCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestValueCache {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            samples: RwLock::new(HashMap::new()),
            status: RwLock::new(LinkStatus::waiting()),
            diagnostic: AtomicBool::new(false),
            version: AtomicU64::new(0),
            notify,
        }
    }

    /// Replace the sample stored under `key`.
    ///
    /// Returns the new cache version.
    pub fn upsert(&self, key: impl Into<String>, sample: SemanticSample) -> Result<u64> {
        let key = key.into();
        if key == STATUS_KEY {
            return Err(SessionError::ReservedKey(key));
        }
        let sample = Arc::new(sample);
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, sample);
        Ok(self.bump())
    }

    /// Merge `partial` into the sample cached under its channel key.
    ///
    /// Fields present in `partial` overwrite; fields absent from it keep
    /// their cached values. Name, sequence, and timestamp come from
    /// `partial`. The read and the write happen under one lock.
    pub fn merge(&self, partial: SemanticSample) -> Result<u64> {
        if partial.channel_key == STATUS_KEY {
            return Err(SessionError::ReservedKey(partial.channel_key));
        }
        {
            let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
            let merged = match samples.get(&partial.channel_key) {
                Some(existing) => {
                    let mut fields = existing.fields.clone();
                    fields.extend(partial.fields);
                    SemanticSample {
                        channel_key: partial.channel_key.clone(),
                        channel_name: partial.channel_name.or(existing.channel_name),
                        fields,
                        sequence: partial.sequence,
                        derived_at: partial.derived_at,
                    }
                }
                None => partial.clone(),
            };
            samples.insert(partial.channel_key, Arc::new(merged));
        }
        Ok(self.bump())
    }

    /// Latest sample for `key`. [`STATUS_KEY`] is never a sample; use
    /// [`link_status`](Self::link_status).
    pub fn get(&self, key: &str) -> Option<SemanticSample> {
        let sample = self
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        Some(SemanticSample::clone(&sample))
    }

    /// All samples plus link status.
    pub fn get_all(&self) -> CacheSnapshot {
        let (entries, version) = {
            let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
            let entries: Vec<(String, Arc<SemanticSample>)> = samples
                .iter()
                .map(|(key, sample)| (key.clone(), Arc::clone(sample)))
                .collect();
            (entries, self.version.load(Ordering::Acquire))
        };
        CacheSnapshot {
            samples: entries
                .into_iter()
                .map(|(key, sample)| (key, SemanticSample::clone(&sample)))
                .collect(),
            status: self.link_status(),
            version,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current link status. Reads TEST while diagnostic mode is on.
    pub fn link_status(&self) -> LinkStatus {
        if self.diagnostic.load(Ordering::Acquire) {
            return LinkStatus::diagnostic();
        }
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a derived link status.
    pub fn set_status(&self, status: LinkStatus) -> u64 {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
        self.bump()
    }

    /// Turn diagnostic mode on or off. While on, [`link_status`](Self::link_status)
    /// reports TEST regardless of link statistics.
    pub fn set_diagnostic(&self, on: bool) {
        if self.diagnostic.swap(on, Ordering::AcqRel) != on {
            self.bump();
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic.load(Ordering::Acquire)
    }

    /// Number of writes so far. Increases monotonically.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Receiver that observes each new version.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn bump(&self) -> u64 {
        let version = self.version.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        self.notify.send_replace(version);
        version
    }
}
