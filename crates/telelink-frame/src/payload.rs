use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};

use crate::channel::is_known;
use crate::codec::PAYLOAD_LEN;

/// Number of value slots carried by every record.
pub const VALUE_COUNT: usize = 7;

/// Which binary layout a deployment's transmitters use.
///
/// Both layouts are 32 bytes, so a payload cannot be classified by trying
/// one and falling back to the other: the NEW layout always parses. The
/// layout is therefore chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadLayout {
    /// `u16 channel_id | u16 sequence | f32 × 7`, little-endian.
    #[default]
    New,
    /// `f32 × 8`, little-endian; the first float truncated to `u16` is the channel id.
    Legacy,
    /// Prefer whichever reading yields a known channel id, NEW first.
    Auto,
}

impl PayloadLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadLayout::New => "new",
            PayloadLayout::Legacy => "legacy",
            PayloadLayout::Auto => "auto",
        }
    }
}

impl fmt::Display for PayloadLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(PayloadLayout::New),
            "legacy" => Ok(PayloadLayout::Legacy),
            "auto" => Ok(PayloadLayout::Auto),
            other => Err(format!(
                "unknown payload layout '{other}' (expected new, legacy, or auto)"
            )),
        }
    }
}

/// The layout a record was actually read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    New,
    Legacy,
}

impl FormatTag {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatTag::New => "NEW",
            FormatTag::Legacy => "LEGACY",
        }
    }
}

/// A payload read under one layout, before any channel semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRecord {
    pub channel_id: u16,
    /// Transmitter sequence counter. Absent in the LEGACY layout.
    pub sequence: Option<u16>,
    /// `v1..v7` in wire order.
    pub values: [f32; VALUE_COUNT],
    pub format: FormatTag,
}

/// One human-readable line per record, for live logs.
///
/// `id=0x640 seq=7 v=[12.50, 3.70, 41.20, 0.00, 0.00, 0.00, 0.00]`
impl fmt::Display for NormalizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={:#X} ", self.channel_id)?;
        match self.sequence {
            Some(seq) => write!(f, "seq={seq} ")?,
            None => f.write_str("seq=- ")?,
        }
        f.write_str("v=[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value:.2}")?;
        }
        f.write_str("]")
    }
}

/// Reads validated payloads under a configured layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadDecoder {
    layout: PayloadLayout,
}

impl PayloadDecoder {
    pub fn new(layout: PayloadLayout) -> Self {
        Self { layout }
    }

    /// The configured layout.
    pub fn layout(&self) -> PayloadLayout {
        self.layout
    }

    /// Decode a payload. Returns `None` unless it is exactly 32 bytes.
    pub fn decode(&self, payload: &[u8]) -> Option<NormalizedRecord> {
        let bytes: &[u8; PAYLOAD_LEN] = payload.try_into().ok()?;
        let record = match self.layout {
            PayloadLayout::New => decode_new(bytes),
            PayloadLayout::Legacy => decode_legacy(bytes),
            PayloadLayout::Auto => {
                let new = decode_new(bytes);
                if is_known(new.channel_id) {
                    new
                } else {
                    let legacy = decode_legacy(bytes);
                    if is_known(legacy.channel_id) {
                        legacy
                    } else {
                        new
                    }
                }
            }
        };
        Some(record)
    }
}

fn decode_new(bytes: &[u8; PAYLOAD_LEN]) -> NormalizedRecord {
    let mut buf = &bytes[..];
    let channel_id = buf.get_u16_le();
    let sequence = buf.get_u16_le();
    NormalizedRecord {
        channel_id,
        sequence: Some(sequence),
        values: read_values(&mut buf),
        format: FormatTag::New,
    }
}

fn decode_legacy(bytes: &[u8; PAYLOAD_LEN]) -> NormalizedRecord {
    let mut buf = &bytes[..];
    let id = buf.get_f32_le();
    NormalizedRecord {
        channel_id: legacy_channel_id(id),
        sequence: None,
        values: read_values(&mut buf),
        format: FormatTag::Legacy,
    }
}

fn read_values(buf: &mut &[u8]) -> [f32; VALUE_COUNT] {
    let mut values = [0f32; VALUE_COUNT];
    for value in values.iter_mut() {
        *value = buf.get_f32_le();
    }
    values
}

/// Truncate toward zero, then keep the low 16 bits. NaN reads as 0.
fn legacy_channel_id(id: f32) -> u16 {
    ((id as i64) & 0xFFFF) as u16
}

/// Build a NEW-layout payload.
pub fn encode_new(
    channel_id: u16,
    sequence: u16,
    values: &[f32; VALUE_COUNT],
) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    let mut buf = &mut out[..];
    buf.put_u16_le(channel_id);
    buf.put_u16_le(sequence);
    for value in values {
        buf.put_f32_le(*value);
    }
    out
}

/// Build a LEGACY-layout payload.
pub fn encode_legacy(channel_id: u16, values: &[f32; VALUE_COUNT]) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    let mut buf = &mut out[..];
    buf.put_f32_le(f32::from(channel_id));
    for value in values {
        buf.put_f32_le(*value);
    }
    out
}
