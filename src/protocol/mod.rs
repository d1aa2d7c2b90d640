//! MySQL client protocol, prepared statement subset.
//!
//! This module speaks enough of the MySQL client/server protocol to prepare a
//! statement on a backend, execute it with bound parameters and close it. It
//! sits on top of a packet level [`PacketIo`] connection and keeps a statement
//! cache per [`Conn`].
//!
//! # Key Components
//!
//! - [`Argument`]: explicit, typed statement parameter.
//! - [`encode_params`]: null bitmap, type tags and values of an execute command.
//! - [`PacketTransport`]: packet framing over any `Read + Write` stream.
//! - [`Conn`]: backend connection owning the statement cache.
//! - [`PreparedStatement`]: prepare, execute (repeatable), close.
//!
//! # Binary Format
//!
//! - prepare: `[0x16][query]`, answered by
//!   `[0x00][id: u32][columns: u16][params: u16][filler][warnings: u16]` and
//!   one EOF terminated metadata block per non-zero count.
//! - execute: `[0x17][id: u32][cursor flag = 0][iterations: u32 = 1]`, then for
//!   statements with parameters `[null bitmap][0x01][types][values]`.
//! - close: `[0x19][id: u32]`, never answered.
//!
//! All integers are little-endian.
//!
//! # Example
//! ```rust
//! use mixer::protocol::{Argument, encode_params};
//!
//! let encoded = encode_params(3, &[Argument::Null, Argument::I32(5), "hi".into()]).unwrap();
//! assert_eq!(encoded.null_bitmap, vec![0b001]);
//! assert_eq!(encoded.values, vec![5, 0, 0, 0, 2, b'h', b'i']);
//! ```
use std::io;

use thiserror::Error;

mod codec;
pub mod constants;
mod conn;
mod packet;
mod stmt;
mod transport;

pub use codec::{Argument, EncodedParams, encode_execute, encode_params};
pub use conn::{Conn, ExecResult, RawResultset, StmtMeta};
pub use packet::{OkPacket, ServerError, read_lenenc_int, write_lenenc_int};
pub use stmt::{PreparedStatement, RowDecoder};
pub use transport::{PacketIo, PacketTransport};

/// Statement arguments rejected before anything is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument mismatch, need {expected} but got {got}")]
    Count { expected: usize, got: usize },

    #[error("invalid argument type {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("unexpected packet header 0x{0:02x}")]
    UnexpectedHeader(u8),

    #[error(transparent)]
    Argument(#[from] ArgumentError),
}
