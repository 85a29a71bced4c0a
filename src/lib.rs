//! # thriftwire
//!
//! Codecs for the Apache Thrift wire formats.
//!
//! The crate is organized around a small wire abstraction — the
//! [`wire::Reader`] and [`wire::Writer`] traits plus the [`wire::Protocol`]
//! factory — with two codec implementations and a framing wrapper:
//!
//! - [`binary::BinaryProtocol`] — fixed-width big-endian encodings, in the
//!   strict (version-tagged) and non-strict variants
//! - [`compact::CompactProtocol`] — varints, zig-zag integers, field-id
//!   delta encoding, and deferred boolean fields
//! - [`framed::FramedProtocol`] — wraps any protocol in a 4-byte
//!   length-prefixed frame per message
//!
//! On top of the wire layer, the [`value`] module maps in-memory values to
//! and from any codec through cached per-type descriptors: implement
//! [`value::Reflect`] (for structs, via the [`reflect_struct!`] macro) and
//! call [`value::marshal`] / [`value::unmarshal`].
//!
//! Readers and writers are single-threaded: operations on one instance are
//! strictly sequential. Writers buffer internally and require a final
//! `flush`; both sides support `reset` to reuse their allocations against a
//! fresh stream.

pub mod binary;
pub mod compact;
pub mod error;
pub mod framed;
pub mod memo;
pub mod value;
pub mod wire;

pub use error::{Error, Result, SemanticError};
pub use value::{marshal, unmarshal, List, Reflect, Set};
pub use wire::{join, skip, MessageType, Protocol, Reader, Type, Writer};
