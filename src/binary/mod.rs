//! The Thrift Binary protocol encoding.
//!
//! Fixed-width big-endian encodings throughout:
//!
//! ```text
//! strict message header          non-strict message header
//! ┌─────────────────────────┐    ┌─────────────────────────┐
//! │ i32  0x80010000 | kind  │    │ i32  len(name)  (>= 0)  │
//! │ i32  len(name)          │    │ raw  name               │
//! │ raw  name               │    │ u8   kind               │
//! │ i32  seq                │    │ i32  seq                │
//! └─────────────────────────┘    └─────────────────────────┘
//! ```
//!
//! A field header is one type byte (0 terminates the field list) followed
//! by an `i16` id; map/set/list headers are element-type bytes followed by
//! an `i32` size. Structs have no begin bytes; struct end is the single
//! stop byte.

use std::io;

use crate::error::{Error, Result};
use crate::wire::bufio::{self, ByteReader, ByteWriter};
use crate::wire::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, Protocol, Reader, SetHeader,
    StructHeader, Type, Writer,
};

const VERSION_MASK: u32 = 0xffff_0000;
const VERSION_1: u32 = 0x8001_0000;

/// The [`Protocol`] implementing the Thrift Binary encoding.
///
/// The default, [`BinaryProtocol::new`], is the strict variant with a
/// version-tagged message header. [`BinaryProtocol::non_strict`] produces
/// the older headerless form and accepts both on read.
#[derive(Debug, Clone, Copy)]
pub struct BinaryProtocol {
    strict: bool,
}

impl BinaryProtocol {
    pub fn new() -> Self {
        Self { strict: true }
    }

    pub fn non_strict() -> Self {
        Self { strict: false }
    }
}

impl Default for BinaryProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for BinaryProtocol {
    fn new_reader(&self, input: Box<dyn io::Read>) -> Box<dyn Reader> {
        Box::new(BinaryReader {
            src: ByteReader::new(input),
            strict: self.strict,
        })
    }

    fn new_writer(&self, output: Box<dyn io::Write>) -> Box<dyn Writer> {
        Box::new(BinaryWriter {
            dst: ByteWriter::new(output),
            strict: self.strict,
        })
    }
}

struct BinaryReader {
    src: ByteReader,
    strict: bool,
}

impl BinaryReader {
    fn read_type(&mut self) -> Result<Type> {
        Type::try_from(self.src.read_u8()?)
    }

    fn read_size(&mut self) -> Result<usize> {
        let v = self.read_i32()?;
        usize::try_from(v)
            .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::InvalidData, "negative size")))
    }
}

impl Reader for BinaryReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        let n = self.read_i32()?;
        if n < 0 {
            let version = (n as u32) & VERSION_MASK;
            if version != VERSION_1 {
                return Err(Error::VersionMismatch(format!("bad version {version:#x}")));
            }
            let kind = MessageType::try_from(n as u8)?;
            let name = self.read_string()?;
            let id = self.read_i32()?;
            return Ok(MessageHeader { name, kind, id });
        }
        if self.strict {
            return Err(Error::VersionMismatch(
                "missing version in message header".into(),
            ));
        }
        let name = bufio::read_string(&mut self.src, n as usize)?;
        let kind = MessageType::try_from(self.src.read_u8()?)?;
        let id = self.read_i32()?;
        Ok(MessageHeader { name, kind, id })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<StructHeader> {
        Ok(StructHeader::default())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let ty = self.read_type()?;
        if ty == Type::Stop {
            return Ok(FieldHeader { name: None, ty, id: 0 });
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { name: None, ty, id })
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        let key = self.read_type()?;
        let value = self.read_type()?;
        let size = self.read_size()?;
        Ok(MapHeader { key, value, size })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        let element = self.read_type()?;
        let size = self.read_size()?;
        Ok(SetHeader { element, size })
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader> {
        self.read_set_begin().map(ListHeader::from)
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.src.read_u8()? != 0)
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.src.read_u8()
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.src.next_array()?)))
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.src.next_array()?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.src.next_array()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.src.next_array()?))
    }

    fn read_string(&mut self) -> Result<String> {
        let n = self.read_size()?;
        bufio::read_string(&mut self.src, n)
    }

    fn read_bytes(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let n = self.read_size()?;
        bufio::read_bytes(&mut self.src, n, buf)
    }

    fn read_uuid(&mut self, v: &mut [u8; 16]) -> Result<()> {
        self.src.read_full(v)
    }

    fn skip_string(&mut self) -> Result<()> {
        let n = self.read_size()?;
        self.src.discard(n)
    }

    fn skip_uuid(&mut self) -> Result<()> {
        self.src.discard(16)
    }

    fn reset(&mut self, input: Box<dyn io::Read>) {
        self.src.reset(input);
    }
}

struct BinaryWriter {
    dst: ByteWriter,
    strict: bool,
}

impl BinaryWriter {
    fn write_type(&mut self, t: Type) -> Result<()> {
        self.dst.write_u8(t as u8)
    }

    fn write_size(&mut self, v: usize) -> Result<()> {
        self.write_i32(v as i32)
    }
}

impl Writer for BinaryWriter {
    fn write_message_begin(&mut self, h: MessageHeader) -> Result<()> {
        if self.strict {
            self.write_i32((VERSION_1 | h.kind as u32) as i32)?;
            self.write_string(&h.name)?;
            return self.write_i32(h.id);
        }
        self.write_string(&h.name)?;
        self.dst.write_u8(h.kind as u8)?;
        self.write_i32(h.id)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _h: StructHeader) -> Result<()> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.write_type(Type::Stop)
    }

    fn write_field_begin(&mut self, h: FieldHeader) -> Result<()> {
        self.write_type(h.ty)?;
        self.write_i16(h.id)
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, h: MapHeader) -> Result<()> {
        self.write_type(h.key)?;
        self.write_type(h.value)?;
        self.write_size(h.size)
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, h: SetHeader) -> Result<()> {
        self.write_type(h.element)?;
        self.write_size(h.size)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_list_begin(&mut self, h: ListHeader) -> Result<()> {
        self.write_set_begin(h.into())
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.dst.write_u8(v as u8)
    }

    fn write_byte(&mut self, v: u8) -> Result<()> {
        self.dst.write_u8(v)
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.dst.write_all(&v.to_bits().to_be_bytes())
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.dst.write_all(&v.to_be_bytes())
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.dst.write_all(&v.to_be_bytes())
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.dst.write_all(&v.to_be_bytes())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_size(v.len())?;
        self.dst.write_all(v.as_bytes())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_size(v.len())?;
        self.dst.write_all(v)
    }

    fn write_uuid(&mut self, v: &[u8; 16]) -> Result<()> {
        self.dst.write_all(v)
    }

    fn flush(&mut self) -> Result<()> {
        self.dst.flush()
    }

    fn reset(&mut self, output: Box<dyn io::Write>) {
        self.dst.reset(output);
    }
}
