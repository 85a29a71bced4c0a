//! The Thrift Compact protocol encoding.
//!
//! Compact trades fixed-width fields for varints and packed nibbles:
//!
//! ```text
//! message header                 field header (short form)
//! ┌──────────────────────────┐   ┌───────────────────────────┐
//! │ u8      0x82             │   │ u8  (delta << 4) | nibble │
//! │ u8      (kind << 5) | 1  │   └───────────────────────────┘
//! │ varint  seq              │   field header (long form)
//! │ varint  len(name)        │   ┌───────────────────────────┐
//! │ raw     name             │   │ u8       nibble           │
//! └──────────────────────────┘   │ zig-zag  field id         │
//!                                └───────────────────────────┘
//! ```
//!
//! `i16`/`i32`/`i64` are zig-zag varints, doubles are little-endian, and
//! field ids are delta-encoded against the previous id in the enclosing
//! struct (a stack tracks enclosing structs). A boolean struct field
//! carries its value in the header's type nibble: `write_field_begin`
//! defers the header until the following `write_bool` supplies the value,
//! and `read_field_begin` records the implicit value for the next
//! `read_bool`.

mod types;

use std::io;

use crate::error::{Error, Result};
use crate::wire::bufio::{self, ByteReader, ByteWriter};
use crate::wire::varint::{self, MAX_VARINT_LEN64};
use crate::wire::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, Protocol, Reader, SetHeader,
    StructHeader, Type, Writer,
};

use types::{to_compact, CompactType};

const PROTOCOL_ID: u8 = 0x82;
const VERSION_1: u8 = 1;

/// Maximum encoded size of a Compact field header.
const MAX_FIELD_HEADER_LEN: usize = 1 + MAX_VARINT_LEN64;

/// The [`Protocol`] implementing the Thrift Compact encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactProtocol;

impl Protocol for CompactProtocol {
    fn new_reader(&self, input: Box<dyn io::Read>) -> Box<dyn Reader> {
        Box::new(CompactReader {
            src: ByteReader::new(input),
            last_field_ids: Vec::new(),
            last_field_id: 0,
            bool_field: BoolField::None,
        })
    }

    fn new_writer(&self, output: Box<dyn io::Write>) -> Box<dyn Writer> {
        Box::new(CompactWriter {
            dst: ByteWriter::new(output),
            last_field_ids: Vec::new(),
            last_field_id: 0,
            bool_field: None,
        })
    }
}

/// Value of a boolean carried by the preceding field header, pending its
/// `read_bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolField {
    None,
    True,
    False,
}

struct CompactReader {
    src: ByteReader,
    last_field_ids: Vec<i16>,
    last_field_id: i16,
    bool_field: BoolField,
}

impl CompactReader {
    fn read_size(&mut self) -> Result<usize> {
        Ok(varint::read_uvarint(&mut self.src)? as usize)
    }
}

impl Reader for CompactReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        let p = self.src.read_u8()?;
        if p != PROTOCOL_ID {
            return Err(Error::VersionMismatch(format!("bad protocol id {p:#04x}")));
        }
        let vt = self.src.read_u8()?;
        let version = vt & 0x1f;
        if version != VERSION_1 {
            return Err(Error::VersionMismatch(format!("bad version {version}")));
        }
        let kind = MessageType::try_from(vt >> 5)?;
        let id = varint::read_uvarint(&mut self.src)? as i32;
        let name = self.read_string()?;
        Ok(MessageHeader { name, kind, id })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<StructHeader> {
        self.last_field_ids.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(StructHeader::default())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.last_field_id = self.last_field_ids.pop().ok_or_else(|| {
            Error::Framing("read_struct_end without matching read_struct_begin".into())
        })?;
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let dt = self.src.read_u8()?;
        let ct = CompactType::from_nibble(dt & 0x0f)?;
        let ty = ct.wire();
        if ty == Type::Stop {
            return Ok(FieldHeader { name: None, ty, id: 0 });
        }
        let modifier = i16::from(dt >> 4);
        let id = if modifier == 0 {
            self.read_i16()?
        } else {
            self.last_field_id.wrapping_add(modifier)
        };
        self.last_field_id = id;
        match ct {
            CompactType::BooleanTrue => self.bool_field = BoolField::True,
            CompactType::BooleanFalse => self.bool_field = BoolField::False,
            _ => {}
        }
        Ok(FieldHeader { name: None, ty, id })
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        let size = self.read_size()?;
        if size == 0 {
            return Ok(MapHeader {
                key: Type::Stop,
                value: Type::Stop,
                size: 0,
            });
        }
        let kv = self.src.read_u8()?;
        let key = CompactType::from_nibble(kv >> 4)?.wire();
        let value = CompactType::from_nibble(kv & 0x0f)?.wire();
        Ok(MapHeader { key, value, size })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        let st = self.src.read_u8()?;
        let element = CompactType::from_nibble(st & 0x0f)?.wire();
        let mut size = usize::from(st >> 4);
        if size == 15 {
            size = self.read_size()?;
        }
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
        match std::mem::replace(&mut self.bool_field, BoolField::None) {
            BoolField::True => Ok(true),
            BoolField::False => Ok(false),
            BoolField::None => Ok(self.src.read_u8()? != 0),
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.src.read_u8()
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_le_bytes(self.src.next_array()?)))
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_i64()? as i16)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_i64()? as i32)
    }

    fn read_i64(&mut self) -> Result<i64> {
        varint::read_varint(&mut self.src)
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
        self.last_field_ids.clear();
        self.last_field_id = 0;
        self.bool_field = BoolField::None;
    }
}

struct CompactWriter {
    dst: ByteWriter,
    last_field_ids: Vec<i16>,
    last_field_id: i16,
    /// Deferred boolean field header, emitted by the next `write_bool`.
    bool_field: Option<FieldHeader>,
}

impl CompactWriter {
    fn write_field_header(&mut self, h: &FieldHeader, is_true: bool) -> Result<()> {
        let ct = if h.ty == Type::Bool {
            if is_true {
                CompactType::BooleanTrue
            } else {
                CompactType::BooleanFalse
            }
        } else {
            to_compact(h.ty)?
        };
        let delta = h.id.wrapping_sub(self.last_field_id);
        let id = h.id;
        self.dst.append_with(MAX_FIELD_HEADER_LEN, |buf| {
            if (1..=15).contains(&delta) {
                buf.extend_from_slice(&[((delta as u8) << 4) | ct as u8]);
            } else {
                buf.extend_from_slice(&[ct as u8]);
                varint::put_varint(buf, i64::from(id));
            }
        })?;
        self.last_field_id = id;
        Ok(())
    }

    fn write_uvarint(&mut self, v: u64) -> Result<()> {
        self.dst
            .append_with(MAX_VARINT_LEN64, |buf| varint::put_uvarint(buf, v))
    }

    fn write_size(&mut self, v: usize) -> Result<()> {
        self.write_uvarint(v as u64)
    }
}

impl Writer for CompactWriter {
    fn write_message_begin(&mut self, h: MessageHeader) -> Result<()> {
        self.dst.write_u8(PROTOCOL_ID)?;
        self.dst.write_u8(VERSION_1 | (h.kind as u8) << 5)?;
        self.write_uvarint(h.id as u64)?;
        self.write_string(&h.name)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _h: StructHeader) -> Result<()> {
        self.last_field_ids.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        if self.bool_field.is_some() {
            return Err(Error::Framing(
                "write_struct_end with a deferred bool field awaiting write_bool".into(),
            ));
        }
        self.last_field_id = self.last_field_ids.pop().ok_or_else(|| {
            Error::Framing("write_struct_end without matching write_struct_begin".into())
        })?;
        self.dst.write_u8(CompactType::Stop as u8)
    }

    fn write_field_begin(&mut self, h: FieldHeader) -> Result<()> {
        if self.bool_field.is_some() {
            return Err(Error::Framing(
                "write_field_begin with a deferred bool field awaiting write_bool".into(),
            ));
        }
        if h.ty == Type::Bool {
            self.bool_field = Some(h);
            return Ok(());
        }
        self.write_field_header(&h, false)
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, h: MapHeader) -> Result<()> {
        if h.size == 0 {
            return self.dst.write_u8(0);
        }
        let k = to_compact(h.key)?;
        let v = to_compact(h.value)?;
        let size = h.size;
        self.dst.append_with(MAX_VARINT_LEN64 + 1, |buf| {
            varint::put_uvarint(buf, size as u64);
            buf.extend_from_slice(&[(k as u8) << 4 | v as u8]);
        })
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, h: SetHeader) -> Result<()> {
        let e = to_compact(h.element)?;
        let size = h.size;
        self.dst.append_with(1 + MAX_VARINT_LEN64, |buf| {
            if size < 15 {
                buf.extend_from_slice(&[(size as u8) << 4 | e as u8]);
            } else {
                buf.extend_from_slice(&[0xf0 | e as u8]);
                varint::put_uvarint(buf, size as u64);
            }
        })
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
        if let Some(h) = self.bool_field.take() {
            return self.write_field_header(&h, v);
        }
        self.dst.write_u8(v as u8)
    }

    fn write_byte(&mut self, v: u8) -> Result<()> {
        self.dst.write_u8(v)
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.dst.write_all(&v.to_bits().to_le_bytes())
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_i64(i64::from(v))
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_i64(i64::from(v))
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.dst
            .append_with(MAX_VARINT_LEN64, |buf| varint::put_varint(buf, v))
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
        self.last_field_ids.clear();
        self.last_field_id = 0;
        self.bool_field = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl io::Write for SharedSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn written(f: impl FnOnce(&mut dyn Writer)) -> Vec<u8> {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        f(&mut *w);
        w.flush().unwrap();
        let out = sink.0.borrow().clone();
        out
    }

    fn reader_over(data: Vec<u8>) -> Box<dyn Reader> {
        CompactProtocol.new_reader(Box::new(Cursor::new(data)))
    }

    fn field(ty: Type, id: i16) -> FieldHeader {
        FieldHeader { name: None, ty, id }
    }

    #[test]
    fn test_message_header_layout() {
        let bytes = written(|w| {
            w.write_message_begin(MessageHeader {
                name: "Ping".into(),
                kind: MessageType::Call,
                id: 1,
            })
            .unwrap();
        });
        assert_eq!(bytes[0], 0x82);
        assert_eq!(bytes[1], (1 << 5) | 0x01);
        assert_eq!(bytes[2], 1); // seq as uvarint
        assert_eq!(bytes[3], 4); // name length as uvarint
        assert_eq!(&bytes[4..], b"Ping");
    }

    #[test]
    fn test_message_round_trip() {
        let want = MessageHeader {
            name: "Echo".into(),
            kind: MessageType::Exception,
            id: -5,
        };
        let bytes = written(|w| w.write_message_begin(want.clone()).unwrap());
        let mut r = reader_over(bytes);
        assert_eq!(r.read_message_begin().unwrap(), want);
    }

    #[test]
    fn test_bad_protocol_id_rejected() {
        let mut r = reader_over(vec![0x83, 0x21]);
        assert!(matches!(
            r.read_message_begin(),
            Err(Error::VersionMismatch(_))
        ));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut r = reader_over(vec![0x82, (1 << 5) | 0x02]);
        assert!(matches!(
            r.read_message_begin(),
            Err(Error::VersionMismatch(_))
        ));
    }

    #[test]
    fn test_deferred_bool_true_header() {
        let bytes = written(|w| {
            w.write_struct_begin(StructHeader::default()).unwrap();
            w.write_field_begin(field(Type::Bool, 1)).unwrap();
            w.write_bool(true).unwrap();
            w.write_field_end().unwrap();
            w.write_struct_end().unwrap();
        });
        // Header byte only (delta=1, BOOLEAN_TRUE); no payload byte.
        assert_eq!(bytes, vec![0x11, 0x00]);
    }

    #[test]
    fn test_deferred_bool_false_header() {
        let bytes = written(|w| {
            w.write_struct_begin(StructHeader::default()).unwrap();
            w.write_field_begin(field(Type::Bool, 1)).unwrap();
            w.write_bool(false).unwrap();
            w.write_field_end().unwrap();
            w.write_struct_end().unwrap();
        });
        assert_eq!(bytes, vec![0x12, 0x00]);
    }

    #[test]
    fn test_deferred_bool_round_trip() {
        for want in [true, false] {
            let bytes = written(|w| {
                w.write_struct_begin(StructHeader::default()).unwrap();
                w.write_field_begin(field(Type::Bool, 3)).unwrap();
                w.write_bool(want).unwrap();
                w.write_field_end().unwrap();
                w.write_struct_end().unwrap();
            });
            let mut r = reader_over(bytes);
            r.read_struct_begin().unwrap();
            let h = r.read_field_begin().unwrap();
            assert_eq!((h.ty, h.id), (Type::Bool, 3));
            assert_eq!(r.read_bool().unwrap(), want);
            r.read_field_end().unwrap();
            assert_eq!(r.read_field_begin().unwrap().ty, Type::Stop);
            r.read_struct_end().unwrap();
        }
    }

    #[test]
    fn test_standalone_bool_is_one_byte() {
        let bytes = written(|w| {
            w.write_bool(true).unwrap();
            w.write_bool(false).unwrap();
        });
        assert_eq!(bytes, vec![1, 0]);
        let mut r = reader_over(bytes);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
    }

    #[test]
    fn test_unconsumed_deferred_bool_is_an_error() {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        w.write_struct_begin(StructHeader::default()).unwrap();
        w.write_field_begin(field(Type::Bool, 1)).unwrap();
        let err = w.write_field_begin(field(Type::I32, 2)).unwrap_err();
        assert!(matches!(err, Error::Framing(_)), "got {err:?}");
    }

    #[test]
    fn test_unconsumed_deferred_bool_blocks_struct_end() {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        w.write_struct_begin(StructHeader::default()).unwrap();
        w.write_field_begin(field(Type::Bool, 1)).unwrap();
        assert!(matches!(w.write_struct_end(), Err(Error::Framing(_))));
    }

    #[test]
    fn test_field_delta_short_and_long_form() {
        let bytes = written(|w| {
            w.write_struct_begin(StructHeader::default()).unwrap();
            w.write_field_begin(field(Type::I32, 1)).unwrap(); // delta 1
            w.write_i32(0).unwrap();
            w.write_field_begin(field(Type::I32, 16)).unwrap(); // delta 15
            w.write_i32(0).unwrap();
            w.write_field_begin(field(Type::I32, 32)).unwrap(); // delta 16: long form
            w.write_i32(0).unwrap();
            w.write_field_begin(field(Type::I32, 20)).unwrap(); // backwards: long form
            w.write_i32(0).unwrap();
            w.write_struct_end().unwrap();
        });
        assert_eq!(bytes[0], 0x15); // (1 << 4) | I32
        assert_eq!(bytes[2], 0xf5); // (15 << 4) | I32
        assert_eq!(bytes[4], 0x05); // long form marker
        assert_eq!(bytes[5], 64); // zig-zag(32)
        assert_eq!(bytes[7], 0x05);
        assert_eq!(bytes[8], 40); // zig-zag(20)
    }

    #[test]
    fn test_field_delta_round_trip() {
        let ids = [1i16, 2, 17, 16, 300, -4, 32767];
        let bytes = written(|w| {
            w.write_struct_begin(StructHeader::default()).unwrap();
            for id in ids {
                w.write_field_begin(field(Type::Byte, id)).unwrap();
                w.write_byte(0).unwrap();
                w.write_field_end().unwrap();
            }
            w.write_struct_end().unwrap();
        });
        let mut r = reader_over(bytes);
        r.read_struct_begin().unwrap();
        for id in ids {
            let h = r.read_field_begin().unwrap();
            assert_eq!(h.id, id);
            r.read_byte().unwrap();
            r.read_field_end().unwrap();
        }
        assert_eq!(r.read_field_begin().unwrap().ty, Type::Stop);
        r.read_struct_end().unwrap();
    }

    #[test]
    fn test_nested_struct_resets_delta_base() {
        let bytes = written(|w| {
            w.write_struct_begin(StructHeader::default()).unwrap();
            w.write_field_begin(field(Type::I32, 5)).unwrap();
            w.write_i32(0).unwrap();
            w.write_field_begin(field(Type::Struct, 6)).unwrap();
            {
                w.write_struct_begin(StructHeader::default()).unwrap();
                // Inner field 5 must use short form: the base reset to 0.
                w.write_field_begin(field(Type::I32, 5)).unwrap();
                w.write_i32(0).unwrap();
                w.write_struct_end().unwrap();
            }
            w.write_field_end().unwrap();
            // Outer base restored: delta from 6 to 7 is short.
            w.write_field_begin(field(Type::I32, 7)).unwrap();
            w.write_i32(0).unwrap();
            w.write_struct_end().unwrap();
        });
        let mut r = reader_over(bytes);
        r.read_struct_begin().unwrap();
        assert_eq!(r.read_field_begin().unwrap().id, 5);
        r.read_i32().unwrap();
        assert_eq!(r.read_field_begin().unwrap().id, 6);
        r.read_struct_begin().unwrap();
        assert_eq!(r.read_field_begin().unwrap().id, 5);
        r.read_i32().unwrap();
        assert_eq!(r.read_field_begin().unwrap().ty, Type::Stop);
        r.read_struct_end().unwrap();
        r.read_field_end().unwrap();
        assert_eq!(r.read_field_begin().unwrap().id, 7);
        r.read_i32().unwrap();
        assert_eq!(r.read_field_begin().unwrap().ty, Type::Stop);
        r.read_struct_end().unwrap();
    }

    #[test]
    fn test_unmatched_struct_end() {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        assert!(matches!(w.write_struct_end(), Err(Error::Framing(_))));

        let mut r = reader_over(Vec::new());
        assert!(matches!(r.read_struct_end(), Err(Error::Framing(_))));
    }

    #[test]
    fn test_empty_map_elides_type_byte() {
        let bytes = written(|w| {
            w.write_map_begin(MapHeader {
                key: Type::Stop,
                value: Type::Stop,
                size: 0,
            })
            .unwrap();
        });
        assert_eq!(bytes, vec![0]);
        let mut r = reader_over(bytes);
        let h = r.read_map_begin().unwrap();
        assert_eq!((h.key, h.value, h.size), (Type::Stop, Type::Stop, 0));
    }

    #[test]
    fn test_map_header_round_trip() {
        let bytes = written(|w| {
            w.write_map_begin(MapHeader {
                key: Type::String,
                value: Type::I64,
                size: 3,
            })
            .unwrap();
        });
        assert_eq!(bytes, vec![3, (8 << 4) | 6]);
        let mut r = reader_over(bytes);
        let h = r.read_map_begin().unwrap();
        assert_eq!((h.key, h.value, h.size), (Type::String, Type::I64, 3));
    }

    #[test]
    fn test_short_list_header_packs_size() {
        let bytes = written(|w| {
            w.write_list_begin(ListHeader {
                element: Type::String,
                size: 0,
            })
            .unwrap();
        });
        assert_eq!(bytes, vec![0x08]);

        let bytes = written(|w| {
            w.write_list_begin(ListHeader {
                element: Type::List,
                size: 0,
            })
            .unwrap();
        });
        assert_eq!(bytes, vec![0x09]);
    }

    #[test]
    fn test_large_list_header_spills_to_uvarint() {
        let bytes = written(|w| {
            w.write_list_begin(ListHeader {
                element: Type::Bool,
                size: 64,
            })
            .unwrap();
        });
        assert_eq!(bytes, vec![0xf1, 64]);
        let mut r = reader_over(bytes);
        let h = r.read_list_begin().unwrap();
        assert_eq!((h.element, h.size), (Type::Bool, 64));
    }

    #[test]
    fn test_set_header_boundary_sizes() {
        for (size, want_len) in [(14usize, 1usize), (15, 2), (127, 2)] {
            let bytes = written(|w| {
                w.write_set_begin(SetHeader {
                    element: Type::I32,
                    size,
                })
                .unwrap();
            });
            assert_eq!(bytes.len(), want_len, "size {size}");
            let mut r = reader_over(bytes);
            assert_eq!(r.read_set_begin().unwrap().size, size);
        }
    }

    #[test]
    fn test_scalars_round_trip() {
        let uuid = *b"0123456789abcdef";
        let bytes = written(|w| {
            w.write_byte(0xab).unwrap();
            w.write_double(-2.5).unwrap();
            w.write_i16(i16::MIN).unwrap();
            w.write_i32(i32::MAX).unwrap();
            w.write_i64(i64::MIN).unwrap();
            w.write_string("hello").unwrap();
            w.write_bytes(b"\x00\xff").unwrap();
            w.write_uuid(&uuid).unwrap();
        });
        let mut r = reader_over(bytes);
        assert_eq!(r.read_byte().unwrap(), 0xab);
        assert_eq!(r.read_double().unwrap(), -2.5);
        assert_eq!(r.read_i16().unwrap(), i16::MIN);
        assert_eq!(r.read_i32().unwrap(), i32::MAX);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.read_string().unwrap(), "hello");
        let mut buf = Vec::new();
        r.read_bytes(&mut buf).unwrap();
        assert_eq!(buf, b"\x00\xff");
        let mut got = [0u8; 16];
        r.read_uuid(&mut got).unwrap();
        assert_eq!(got, uuid);
    }

    #[test]
    fn test_double_is_little_endian() {
        let bytes = written(|w| w.write_double(1.0).unwrap());
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
    }

    #[test]
    fn test_reset_clears_codec_state() {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        w.write_struct_begin(StructHeader::default()).unwrap();
        w.write_field_begin(field(Type::Bool, 1)).unwrap();
        w.reset(Box::new(SharedSink::default()));
        // The deferred bool and struct stack are gone after reset.
        assert!(matches!(w.write_struct_end(), Err(Error::Framing(_))));
        w.write_bool(true).unwrap();
        w.flush().unwrap();
    }
}
