//! Byte-source abstraction for telemetry links.
//!
//! The receiver core never opens, configures, or enumerates a link. It is
//! handed something that implements [`ByteSource`]: a read-with-timeout plus
//! `close()`. This crate provides that trait and two adapters:
//! - [`StreamSource`] over any `std::io::Read` (captures, pipes, serial devices)
//! - [`TcpSource`] for radio-to-serial bridges exposed over TCP (ser2net and friends)

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpSource;
pub use traits::{ByteSource, StreamSource};
