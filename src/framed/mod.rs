//! The Thrift framed transport.
//!
//! Wraps any [`Protocol`] so every message travels as a frame: a 4-byte
//! big-endian length prefix followed by the message bytes. The inner codec
//! is pointed at a shared in-memory buffer; the wrapper moves whole frames
//! between that buffer and the real stream at message boundaries.
//!
//! ```text
//! ┌───────────────┬────────────────────────┐
//! │ u32 BE length │ message bytes (length) │
//! └───────────────┴────────────────────────┘
//! ```

use std::cell::RefCell;
use std::io;
use std::io::{Read as _, Write as _};
use std::rc::Rc;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::wire::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, Protocol, Reader, SetHeader, StructHeader,
    Writer,
};

/// A [`Protocol`] wrapping another protocol in length-prefixed frames.
#[derive(Debug, Clone, Copy)]
pub struct FramedProtocol<P> {
    inner: P,
}

impl<P: Protocol> FramedProtocol<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Protocol> Protocol for FramedProtocol<P> {
    fn new_reader(&self, input: Box<dyn io::Read>) -> Box<dyn Reader> {
        let frame = Rc::new(RefCell::new(BytesMut::new()));
        let inner = self.inner.new_reader(Box::new(SharedBuf(frame.clone())));
        Box::new(FramedReader { inner, frame, input })
    }

    fn new_writer(&self, output: Box<dyn io::Write>) -> Box<dyn Writer> {
        let frame = Rc::new(RefCell::new(BytesMut::new()));
        let inner = self.inner.new_writer(Box::new(SharedBuf(frame.clone())));
        Box::new(FramedWriter {
            inner,
            frame,
            output,
            in_message: false,
        })
    }
}

/// In-memory buffer shared between the framed wrapper and the inner codec.
/// Reads consume from the front; writes append to the back.
struct SharedBuf(Rc<RefCell<BytesMut>>);

impl io::Read for SharedBuf {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut buf = self.0.borrow_mut();
        let n = out.len().min(buf.len());
        out[..n].copy_from_slice(&buf[..n]);
        buf.advance(n);
        Ok(n)
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FramedReader {
    inner: Box<dyn Reader>,
    frame: Rc<RefCell<BytesMut>>,
    input: Box<dyn io::Read>,
}

impl FramedReader {
    fn fill_frame(&mut self) -> Result<()> {
        let mut len_buf = [0u8; 4];
        self.input.read_exact(&mut len_buf)?;
        let n = u64::from(u32::from_be_bytes(len_buf));
        let mut frame = self.frame.borrow_mut();
        let copied = io::copy(&mut (&mut self.input).take(n), &mut (&mut *frame).writer())?;
        if copied < n {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated frame",
            )));
        }
        tracing::trace!(frame_len = n, "read frame");
        Ok(())
    }
}

impl Reader for FramedReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        if !self.frame.borrow().is_empty() {
            return Err(Error::Framing(
                "read_message_begin called without matching read_message_end".into(),
            ));
        }
        self.fill_frame()?;
        self.inner.read_message_begin()
    }

    /// Guarantees that the frame was fully consumed.
    fn read_message_end(&mut self) -> Result<()> {
        self.inner.read_message_end()?;
        let leftover = self.frame.borrow().len();
        if leftover > 0 {
            return Err(Error::Framing(format!(
                "{leftover} byte(s) of the frame were not consumed"
            )));
        }
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<StructHeader> {
        self.inner.read_struct_begin()
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.inner.read_struct_end()
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        self.inner.read_field_begin()
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.inner.read_field_end()
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        self.inner.read_map_begin()
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.inner.read_map_end()
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        self.inner.read_set_begin()
    }

    fn read_set_end(&mut self) -> Result<()> {
        self.inner.read_set_end()
    }

    fn read_list_begin(&mut self) -> Result<ListHeader> {
        self.inner.read_list_begin()
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.inner.read_list_end()
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.inner.read_bool()
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.inner.read_byte()
    }

    fn read_double(&mut self) -> Result<f64> {
        self.inner.read_double()
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.inner.read_i16()
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.inner.read_i32()
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.inner.read_i64()
    }

    fn read_string(&mut self) -> Result<String> {
        self.inner.read_string()
    }

    fn read_bytes(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        self.inner.read_bytes(buf)
    }

    fn read_uuid(&mut self, v: &mut [u8; 16]) -> Result<()> {
        self.inner.read_uuid(v)
    }

    fn skip_string(&mut self) -> Result<()> {
        self.inner.skip_string()
    }

    fn skip_uuid(&mut self) -> Result<()> {
        self.inner.skip_uuid()
    }

    fn reset(&mut self, input: Box<dyn io::Read>) {
        self.inner.reset(Box::new(SharedBuf(self.frame.clone())));
        self.frame.borrow_mut().clear();
        self.input = input;
    }
}

struct FramedWriter {
    inner: Box<dyn Writer>,
    frame: Rc<RefCell<BytesMut>>,
    output: Box<dyn io::Write>,
    in_message: bool,
}

impl Writer for FramedWriter {
    fn write_message_begin(&mut self, h: MessageHeader) -> Result<()> {
        if self.in_message {
            return Err(Error::Framing(
                "write_message_begin called twice without matching write_message_end".into(),
            ));
        }
        self.inner.write_message_begin(h)?;
        self.in_message = true;
        Ok(())
    }

    /// Sends the buffered frame: length prefix, then the message bytes.
    fn write_message_end(&mut self) -> Result<()> {
        self.inner.write_message_end()?;
        self.inner.flush()?;
        let mut frame = self.frame.borrow_mut();
        self.output
            .write_all(&(frame.len() as u32).to_be_bytes())?;
        self.output.write_all(&frame)?;
        tracing::trace!(frame_len = frame.len(), "wrote frame");
        frame.clear();
        self.in_message = false;
        Ok(())
    }

    fn write_struct_begin(&mut self, h: StructHeader) -> Result<()> {
        self.inner.write_struct_begin(h)
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.inner.write_struct_end()
    }

    fn write_field_begin(&mut self, h: FieldHeader) -> Result<()> {
        self.inner.write_field_begin(h)
    }

    fn write_field_end(&mut self) -> Result<()> {
        self.inner.write_field_end()
    }

    fn write_map_begin(&mut self, h: MapHeader) -> Result<()> {
        self.inner.write_map_begin(h)
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.inner.write_map_end()
    }

    fn write_set_begin(&mut self, h: SetHeader) -> Result<()> {
        self.inner.write_set_begin(h)
    }

    fn write_set_end(&mut self) -> Result<()> {
        self.inner.write_set_end()
    }

    fn write_list_begin(&mut self, h: ListHeader) -> Result<()> {
        self.inner.write_list_begin(h)
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.inner.write_list_end()
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.inner.write_bool(v)
    }

    fn write_byte(&mut self, v: u8) -> Result<()> {
        self.inner.write_byte(v)
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.inner.write_double(v)
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.inner.write_i16(v)
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.inner.write_i32(v)
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.inner.write_i64(v)
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.inner.write_string(v)
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.inner.write_bytes(v)
    }

    fn write_uuid(&mut self, v: &[u8; 16]) -> Result<()> {
        self.inner.write_uuid(v)
    }

    /// Flushes only the real sink; frames are emitted by
    /// [`write_message_end`](Writer::write_message_end).
    fn flush(&mut self) -> Result<()> {
        self.output.flush().map_err(Error::from)
    }

    fn reset(&mut self, output: Box<dyn io::Write>) {
        self.inner.reset(Box::new(SharedBuf(self.frame.clone())));
        self.frame.borrow_mut().clear();
        self.output = output;
        self.in_message = false;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;
    use crate::binary::BinaryProtocol;
    use crate::wire::MessageType;

    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Sink>>);

    #[derive(Default)]
    struct Sink {
        data: Vec<u8>,
        flushes: usize,
    }

    impl io::Write for SharedSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().data.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.borrow_mut().flushes += 1;
            Ok(())
        }
    }

    fn ping() -> MessageHeader {
        MessageHeader {
            name: "Ping".into(),
            kind: MessageType::Call,
            id: 1,
        }
    }

    #[test]
    fn test_frame_layout_and_round_trip() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(sink.clone()));
        w.write_message_begin(ping()).unwrap();
        w.write_message_end().unwrap();
        w.flush().unwrap();

        let bytes = sink.0.borrow().data.clone();
        let inner_len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 4 + inner_len);
        // The framed payload is the plain binary-strict message.
        assert_eq!(&bytes[4..8], &[0x80, 0x01, 0x00, 0x01]);

        let mut r = p.new_reader(Box::new(Cursor::new(bytes)));
        assert_eq!(r.read_message_begin().unwrap(), ping());
        r.read_message_end().unwrap();
    }

    #[test]
    fn test_nothing_hits_the_sink_before_message_end() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(sink.clone()));
        w.write_message_begin(ping()).unwrap();
        w.write_i64(42).unwrap();
        assert!(sink.0.borrow().data.is_empty());
        w.write_message_end().unwrap();
        assert!(!sink.0.borrow().data.is_empty());
    }

    #[test]
    fn test_flush_only_touches_real_sink() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(sink.clone()));
        w.write_message_begin(ping()).unwrap();
        assert_eq!(sink.0.borrow().flushes, 0);
        w.write_message_end().unwrap();
        w.flush().unwrap();
        assert_eq!(sink.0.borrow().flushes, 1);
    }

    #[test]
    fn test_reentrant_message_begin_is_an_error() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let mut w = p.new_writer(Box::new(SharedSink::default()));
        w.write_message_begin(ping()).unwrap();
        let err = w.write_message_begin(ping()).unwrap_err();
        assert!(matches!(err, Error::Framing(_)), "got {err:?}");
    }

    #[test]
    fn test_consecutive_frames_stay_aligned() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(sink.clone()));
        for id in 1..=3 {
            let mut h = ping();
            h.id = id;
            w.write_message_begin(h).unwrap();
            w.write_i32(id).unwrap();
            w.write_message_end().unwrap();
        }
        w.flush().unwrap();

        let mut r = p.new_reader(Box::new(Cursor::new(sink.0.borrow().data.clone())));
        for id in 1..=3 {
            let h = r.read_message_begin().unwrap();
            assert_eq!(h.id, id);
            assert_eq!(r.read_i32().unwrap(), id);
            r.read_message_end().unwrap();
        }
    }

    #[test]
    fn test_unread_remainder_is_a_framing_error() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(sink.clone()));
        w.write_message_begin(ping()).unwrap();
        w.write_i64(42).unwrap();
        w.write_message_end().unwrap();

        // Leave the payload behind an inner reader that cannot buffer it.
        let bytes = sink.0.borrow().data.clone();
        let frame = Rc::new(RefCell::new(BytesMut::new()));
        frame
            .borrow_mut()
            .extend_from_slice(b"leftover");
        let mut r = FramedReader {
            inner: BinaryProtocol::new().new_reader(Box::new(SharedBuf(frame.clone()))),
            frame,
            input: Box::new(Cursor::new(bytes)),
        };
        assert!(matches!(r.read_message_begin(), Err(Error::Framing(_))));
        assert!(matches!(r.read_message_end(), Err(Error::Framing(_))));
    }

    #[test]
    fn test_truncated_frame_is_eof() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        // Claims 100 bytes, delivers none.
        let bytes = 100u32.to_be_bytes().to_vec();
        let mut r = p.new_reader(Box::new(Cursor::new(bytes)));
        let err = r.read_message_begin().unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_writer_reset_clears_pending_frame() {
        let p = FramedProtocol::new(BinaryProtocol::new());
        let sink = SharedSink::default();
        let mut w = p.new_writer(Box::new(SharedSink::default()));
        w.write_message_begin(ping()).unwrap();
        w.reset(Box::new(sink.clone()));
        w.write_message_begin(ping()).unwrap();
        w.write_message_end().unwrap();
        let bytes = sink.0.borrow().data.clone();
        let inner_len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 4 + inner_len);
    }
}
