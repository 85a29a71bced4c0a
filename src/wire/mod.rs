//! The codec-neutral wire abstraction.
//!
//! A Thrift payload is a stream of typed values: messages, structs, fields,
//! maps, sets, lists and scalars. This module defines the vocabulary shared
//! by every codec — the [`Type`] and [`MessageType`] tags, the header
//! records, and the [`Reader`]/[`Writer`] traits with one method per
//! construct — plus the [`Protocol`] factory that binds a codec to a byte
//! stream.
//!
//! Codecs live in sibling modules ([`binary`](crate::binary),
//! [`compact`](crate::compact), [`framed`](crate::framed)); the
//! schema-independent [`skip`] routine and the buffered byte adapters are
//! here because every codec shares them.

use std::fmt;
use std::io;

use crate::error::{Error, Result};

pub mod bufio;
pub mod varint;

mod skip;

pub use skip::skip;

/// The type of a Thrift value on the wire.
///
/// Numeric values are the Binary-protocol tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    /// Field-list terminator; never the type of a value.
    Stop = 0,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    /// Length-prefixed bytes; also carries binary data.
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
    Uuid = 16,
}

impl TryFrom<u8> for Type {
    type Error = Error;

    fn try_from(v: u8) -> Result<Type> {
        Ok(match v {
            0 => Type::Stop,
            2 => Type::Bool,
            3 => Type::Byte,
            4 => Type::Double,
            6 => Type::I16,
            8 => Type::I32,
            10 => Type::I64,
            11 => Type::String,
            12 => Type::Struct,
            13 => Type::Map,
            14 => Type::Set,
            15 => Type::List,
            16 => Type::Uuid,
            _ => return Err(Error::InvalidType(v)),
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Stop => "stop",
            Type::Bool => "bool",
            Type::Byte => "byte",
            Type::Double => "double",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::String => "string",
            Type::Struct => "struct",
            Type::Map => "map",
            Type::Set => "set",
            Type::List => "list",
            Type::Uuid => "uuid",
        })
    }
}

/// The kind of a Thrift message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    OneWay = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(v: u8) -> Result<MessageType> {
        Ok(match v {
            1 => MessageType::Call,
            2 => MessageType::Reply,
            3 => MessageType::Exception,
            4 => MessageType::OneWay,
            _ => return Err(Error::InvalidType(v)),
        })
    }
}

/// The header of a Thrift message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// May be empty.
    pub name: String,
    pub kind: MessageType,
    pub id: i32,
}

/// The header of a Thrift struct. The name is informational only and is
/// never encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructHeader {
    pub name: Option<&'static str>,
}

/// The header of a Thrift field.
///
/// The sentinel terminating a field list has type [`Type::Stop`] and an
/// undefined id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Informational only; never encoded.
    pub name: Option<&'static str>,
    pub ty: Type,
    pub id: i16,
}

/// The header of a Thrift map. The key and value types may be
/// [`Type::Stop`] iff the size is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key: Type,
    pub value: Type,
    pub size: usize,
}

/// The header of a Thrift set. The element type may be [`Type::Stop`] iff
/// the size is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeader {
    pub element: Type,
    pub size: usize,
}

/// The header of a Thrift list. Same sentinel rule as [`SetHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub element: Type,
    pub size: usize,
}

impl From<SetHeader> for ListHeader {
    fn from(h: SetHeader) -> ListHeader {
        ListHeader {
            element: h.element,
            size: h.size,
        }
    }
}

impl From<ListHeader> for SetHeader {
    fn from(h: ListHeader) -> SetHeader {
        SetHeader {
            element: h.element,
            size: h.size,
        }
    }
}

/// Reads a stream of Thrift values.
///
/// Every `*_begin` call must be matched by exactly one `*_end` call in LIFO
/// order, except that after `read_field_begin` yields [`Type::Stop`] no
/// `read_field_end` follows — the enclosing struct terminates instead.
///
/// `*_end` methods on structures without a terminator in the codec read no
/// bytes; they may still perform bookkeeping.
pub trait Reader {
    fn read_message_begin(&mut self) -> Result<MessageHeader>;
    fn read_message_end(&mut self) -> Result<()>;
    fn read_struct_begin(&mut self) -> Result<StructHeader>;
    fn read_struct_end(&mut self) -> Result<()>;
    fn read_field_begin(&mut self) -> Result<FieldHeader>;
    fn read_field_end(&mut self) -> Result<()>;
    fn read_map_begin(&mut self) -> Result<MapHeader>;
    fn read_map_end(&mut self) -> Result<()>;
    fn read_set_begin(&mut self) -> Result<SetHeader>;
    fn read_set_end(&mut self) -> Result<()>;
    fn read_list_begin(&mut self) -> Result<ListHeader>;
    fn read_list_end(&mut self) -> Result<()>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_byte(&mut self) -> Result<u8>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_string(&mut self) -> Result<String>;
    /// Reads the next binary string, appending it to `buf`.
    fn read_bytes(&mut self, buf: &mut Vec<u8>) -> Result<()>;
    fn read_uuid(&mut self, v: &mut [u8; 16]) -> Result<()>;
    /// Consumes the next string without materializing it.
    fn skip_string(&mut self) -> Result<()>;
    /// Consumes the next UUID without materializing it.
    fn skip_uuid(&mut self) -> Result<()>;
    /// Resets the reader to its initial state, reusing its buffers against
    /// a fresh input.
    fn reset(&mut self, input: Box<dyn io::Read>);
}

/// Writes a stream of Thrift values. Mirrors [`Reader`] and adds `flush`.
pub trait Writer {
    fn write_message_begin(&mut self, h: MessageHeader) -> Result<()>;
    fn write_message_end(&mut self) -> Result<()>;
    fn write_struct_begin(&mut self, h: StructHeader) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;
    fn write_field_begin(&mut self, h: FieldHeader) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_map_begin(&mut self, h: MapHeader) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;
    fn write_set_begin(&mut self, h: SetHeader) -> Result<()>;
    fn write_set_end(&mut self) -> Result<()>;
    fn write_list_begin(&mut self, h: ListHeader) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;
    fn write_bool(&mut self, v: bool) -> Result<()>;
    fn write_byte(&mut self, v: u8) -> Result<()>;
    fn write_double(&mut self, v: f64) -> Result<()>;
    fn write_i16(&mut self, v: i16) -> Result<()>;
    fn write_i32(&mut self, v: i32) -> Result<()>;
    fn write_i64(&mut self, v: i64) -> Result<()>;
    fn write_string(&mut self, v: &str) -> Result<()>;
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;
    fn write_uuid(&mut self, v: &[u8; 16]) -> Result<()>;
    /// Writes any buffered data to the underlying stream and flushes it.
    /// Safe to call multiple times.
    fn flush(&mut self) -> Result<()>;
    /// Resets the writer to its initial state, reusing its buffers against
    /// a fresh output.
    fn reset(&mut self, output: Box<dyn io::Write>);
}

/// A factory producing paired readers and writers bound to a byte stream.
pub trait Protocol {
    fn new_reader(&self, input: Box<dyn io::Read>) -> Box<dyn Reader>;
    fn new_writer(&self, output: Box<dyn io::Write>) -> Box<dyn Writer>;
}

/// A [`Protocol`] that takes its reader side from one protocol and its
/// writer side from another. Built with [`join`].
#[derive(Debug, Clone, Copy)]
pub struct JoinedProtocol<R, W> {
    reader: R,
    writer: W,
}

/// Composes a reader protocol with a writer protocol.
pub fn join<R: Protocol, W: Protocol>(reader: R, writer: W) -> JoinedProtocol<R, W> {
    JoinedProtocol { reader, writer }
}

impl<R: Protocol, W: Protocol> Protocol for JoinedProtocol<R, W> {
    fn new_reader(&self, input: Box<dyn io::Read>) -> Box<dyn Reader> {
        self.reader.new_reader(input)
    }

    fn new_writer(&self, output: Box<dyn io::Write>) -> Box<dyn Writer> {
        self.writer.new_writer(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trip() {
        for t in [
            Type::Stop,
            Type::Bool,
            Type::Byte,
            Type::Double,
            Type::I16,
            Type::I32,
            Type::I64,
            Type::String,
            Type::Struct,
            Type::Map,
            Type::Set,
            Type::List,
            Type::Uuid,
        ] {
            assert_eq!(Type::try_from(t as u8).unwrap(), t);
        }
    }

    #[test]
    fn test_type_rejects_unknown_tags() {
        for v in [1u8, 5, 7, 9, 17, 200] {
            assert!(matches!(Type::try_from(v), Err(Error::InvalidType(got)) if got == v));
        }
    }

    #[test]
    fn test_message_type_rejects_out_of_range() {
        assert!(MessageType::try_from(0).is_err());
        assert!(MessageType::try_from(5).is_err());
        assert_eq!(MessageType::try_from(4).unwrap(), MessageType::OneWay);
    }
}
