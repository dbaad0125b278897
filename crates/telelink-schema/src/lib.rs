//! Static channel schemas and semantic mapping.
//!
//! Turns a [`NormalizedRecord`](telelink_frame::NormalizedRecord) into named
//! fields for its channel (Table 1 of the vehicle telemetry layout), applying
//! percentage clamps and compatibility aliases for older consumers.
//! Unknown channels are never an error; they surface as raw `v1..v7`.

pub mod config;
pub mod error;
pub mod mapper;
pub mod registry;
pub mod sample;

pub use config::MapperConfig;
pub use error::{Result, SchemaError};
pub use mapper::{MappedSamples, SemanticMapper};
pub use registry::{
    schema_by_name, schema_for, table_schema, Alias, ChannelSchema, FieldKind, FieldSpec, CHANNELS,
    POWER_BUS,
};
pub use sample::{channel_key, parse_channel_key, SemanticSample, RAW_FIELDS};
