//! Mapping between wire types and the Compact protocol's packed nibbles.

use crate::error::{Error, Result};
use crate::wire::Type;

/// Type nibble as it appears in Compact field and container headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum CompactType {
    Stop = 0,
    BooleanTrue = 1,
    BooleanFalse = 2,
    I8 = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
    Uuid = 13,
}

impl CompactType {
    pub(crate) fn from_nibble(v: u8) -> Result<CompactType> {
        Ok(match v {
            0 => CompactType::Stop,
            1 => CompactType::BooleanTrue,
            2 => CompactType::BooleanFalse,
            3 => CompactType::I8,
            4 => CompactType::I16,
            5 => CompactType::I32,
            6 => CompactType::I64,
            7 => CompactType::Double,
            8 => CompactType::Binary,
            9 => CompactType::List,
            10 => CompactType::Set,
            11 => CompactType::Map,
            12 => CompactType::Struct,
            13 => CompactType::Uuid,
            _ => return Err(Error::InvalidType(v)),
        })
    }

    pub(crate) fn wire(self) -> Type {
        match self {
            CompactType::Stop => Type::Stop,
            CompactType::BooleanTrue | CompactType::BooleanFalse => Type::Bool,
            CompactType::I8 => Type::Byte,
            CompactType::I16 => Type::I16,
            CompactType::I32 => Type::I32,
            CompactType::I64 => Type::I64,
            CompactType::Double => Type::Double,
            CompactType::Binary => Type::String,
            CompactType::List => Type::List,
            CompactType::Set => Type::Set,
            CompactType::Map => Type::Map,
            CompactType::Struct => Type::Struct,
            CompactType::Uuid => Type::Uuid,
        }
    }
}

/// Maps a wire type to its Compact nibble.
///
/// `Bool` maps to `BOOLEAN_TRUE`, the nibble Compact uses for booleans
/// outside a field header (container elements and map keys/values); the
/// value itself is then a standalone 0/1 byte.
pub(crate) fn to_compact(t: Type) -> Result<CompactType> {
    Ok(match t {
        Type::Bool => CompactType::BooleanTrue,
        Type::Byte => CompactType::I8,
        Type::I16 => CompactType::I16,
        Type::I32 => CompactType::I32,
        Type::I64 => CompactType::I64,
        Type::Double => CompactType::Double,
        Type::String => CompactType::Binary,
        Type::List => CompactType::List,
        Type::Set => CompactType::Set,
        Type::Map => CompactType::Map,
        Type::Struct => CompactType::Struct,
        Type::Uuid => CompactType::Uuid,
        Type::Stop => return Err(Error::InvalidType(t as u8)),
    })
}
