use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use crate::error::{Result, SchemaError};

/// Field names for channels without a schema.
pub const RAW_FIELDS: [&str; 7] = ["v1", "v2", "v3", "v4", "v5", "v6", "v7"];

/// Canonical cache key for a channel id: `0x` plus upper-case hex digits.
///
/// ```
/// assert_eq!(telelink_schema::channel_key(0x640), "0x640");
/// assert_eq!(telelink_schema::channel_key(0x6ff), "0x6FF");
/// ```
pub fn channel_key(id: u16) -> String {
    format!("{id:#X}")
}

/// Parse a channel key (`0x640`, `0X6ff`) or a decimal id (`1600`).
pub fn parse_channel_key(key: &str) -> Result<u16> {
    let trimmed = key.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|_| SchemaError::InvalidChannelKey(key.to_string()))
}

/// Named field values for one channel, derived from one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticSample {
    pub channel_key: String,
    /// Display name from the channel table; `None` for unknown channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<&'static str>,
    pub fields: BTreeMap<&'static str, f32>,
    /// Sequence of the frame that produced this sample, when the layout carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u16>,
    #[serde(serialize_with = "unix_millis")]
    pub derived_at: SystemTime,
}

impl SemanticSample {
    pub fn get(&self, field: &str) -> Option<f32> {
        self.fields.get(field).copied()
    }

    /// True when this sample came from a channel outside the table.
    pub fn is_raw(&self) -> bool {
        self.channel_name.is_none()
    }

    /// Milliseconds since the Unix epoch, saturating at zero for clocks set
    /// before 1970.
    pub fn derived_at_millis(&self) -> u64 {
        millis_since_epoch(self.derived_at)
    }
}

fn millis_since_epoch(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn unix_millis<S: Serializer>(
    at: &SystemTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(millis_since_epoch(*at))
}
