//! Telemetry receiver for radio-to-serial links.
//!
//! telelink turns a noisy byte stream of `AA 55 20 <payload> XOR` frames into
//! a latest-value-per-channel cache with a link health badge.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-source abstraction (any `Read`, TCP serial bridges)
//! - [`frame`]: frame synchronization, checksums, payload layouts
//! - [`schema`]: static channel table and semantic mapping
//! - [`session`]: latest-value cache, link health, producer loop (behind `session` feature)
//! - [`simulate`]: synthetic frame generator for bench runs

pub mod simulate;

/// Re-export transport types.
pub mod transport {
    pub use telelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use telelink_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use telelink_schema::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use telelink_session::*;
}
