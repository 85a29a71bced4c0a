//! An in-memory recorder for wire calls.
//!
//! [`Memo`] hands out a [`Writer`] view that records every call into a
//! shared step log, and a [`Reader`] view that replays the log in order.
//! It is the test double behind the value layer's error-propagation tests:
//! setting a [breakpoint](Memo::set_breakpoint) makes the recorder return
//! [`Error::Break`] *before* executing the chosen step, so a test can
//! verify that an error injected at any suspension point surfaces with the
//! right action tag.
//!
//! A step-name mismatch during replay panics — that is a broken test, not
//! a runtime condition.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::wire::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, Reader, SetHeader, StructHeader, Type,
    Writer,
};

/// A captured wire-call argument.
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Bool(bool),
    Byte(u8),
    Double(f64),
    I16(i16),
    I32(i32),
    I64(i64),
    Str(String),
    Bytes(Vec<u8>),
    Uuid([u8; 16]),
    Message(MessageHeader),
    Struct(StructHeader),
    Field(FieldHeader),
    Map(MapHeader),
    Set(SetHeader),
    List(ListHeader),
}

#[derive(Default)]
struct Inner {
    breakpoint: usize,
    r: usize,
    w: usize,
    steps: Vec<&'static str>,
    values: Vec<Vec<Arg>>,
}

impl Inner {
    fn advance(pos: &mut usize, breakpoint: usize) -> Result<()> {
        if breakpoint > 0 && *pos + 1 >= breakpoint {
            return Err(Error::Break);
        }
        *pos += 1;
        Ok(())
    }
}

/// A shared log of wire calls, replayable through paired reader and writer
/// views.
#[derive(Clone, Default)]
pub struct Memo {
    inner: Rc<RefCell<Inner>>,
}

impl Memo {
    pub fn new() -> Memo {
        Memo::default()
    }

    /// Sets the 1-based step index at which the next advance fails with
    /// [`Error::Break`]; 0 disables.
    pub fn set_breakpoint(&self, step: usize) {
        self.inner.borrow_mut().breakpoint = step;
    }

    /// Returns a copy of the recorded step names. Replayed reads append to
    /// the log too, so after a full round-trip the second half mirrors the
    /// first.
    pub fn steps(&self) -> Vec<&'static str> {
        self.inner.borrow().steps.clone()
    }

    /// Clears the log, cursors, and breakpoint, keeping allocations.
    pub fn reset(&self) {
        let mut m = self.inner.borrow_mut();
        m.breakpoint = 0;
        m.r = 0;
        m.w = 0;
        m.steps.clear();
        m.values.clear();
    }

    /// A [`Writer`] recording into this memo.
    pub fn writer(&self) -> MemoWriter {
        MemoWriter {
            inner: self.inner.clone(),
        }
    }

    /// A [`Reader`] replaying this memo's log. Interleaving its use with
    /// further writes invalidates the replay.
    pub fn reader(&self) -> MemoReader {
        MemoReader {
            inner: self.inner.clone(),
        }
    }
}

/// The recording side of a [`Memo`].
pub struct MemoWriter {
    inner: Rc<RefCell<Inner>>,
}

impl MemoWriter {
    fn record(&mut self, step: &'static str, args: Vec<Arg>) -> Result<()> {
        let mut m = self.inner.borrow_mut();
        let breakpoint = m.breakpoint;
        Inner::advance(&mut m.w, breakpoint)?;
        m.steps.push(step);
        m.values.push(args);
        Ok(())
    }
}

impl Writer for MemoWriter {
    fn write_message_begin(&mut self, h: MessageHeader) -> Result<()> {
        self.record("MessageBegin", vec![Arg::Message(h)])
    }

    fn write_message_end(&mut self) -> Result<()> {
        self.record("MessageEnd", vec![])
    }

    fn write_struct_begin(&mut self, h: StructHeader) -> Result<()> {
        self.record("StructBegin", vec![Arg::Struct(h)])
    }

    /// Also records the implicit field-stop sentinel so that replayed
    /// reads observe it from `read_field_begin`.
    fn write_struct_end(&mut self) -> Result<()> {
        self.record(
            "FieldBegin",
            vec![Arg::Field(FieldHeader {
                name: None,
                ty: Type::Stop,
                id: 0,
            })],
        )?;
        self.record("StructEnd", vec![])
    }

    fn write_field_begin(&mut self, h: FieldHeader) -> Result<()> {
        self.record("FieldBegin", vec![Arg::Field(h)])
    }

    fn write_field_end(&mut self) -> Result<()> {
        self.record("FieldEnd", vec![])
    }

    fn write_map_begin(&mut self, h: MapHeader) -> Result<()> {
        self.record("MapBegin", vec![Arg::Map(h)])
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.record("MapEnd", vec![])
    }

    fn write_set_begin(&mut self, h: SetHeader) -> Result<()> {
        self.record("SetBegin", vec![Arg::Set(h)])
    }

    fn write_set_end(&mut self) -> Result<()> {
        self.record("SetEnd", vec![])
    }

    fn write_list_begin(&mut self, h: ListHeader) -> Result<()> {
        self.record("ListBegin", vec![Arg::List(h)])
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.record("ListEnd", vec![])
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.record("Bool", vec![Arg::Bool(v)])
    }

    fn write_byte(&mut self, v: u8) -> Result<()> {
        self.record("Byte", vec![Arg::Byte(v)])
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.record("Double", vec![Arg::Double(v)])
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.record("I16", vec![Arg::I16(v)])
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.record("I32", vec![Arg::I32(v)])
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.record("I64", vec![Arg::I64(v)])
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.record("String", vec![Arg::Str(v.to_string())])
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.record("Bytes", vec![Arg::Bytes(v.to_vec())])
    }

    fn write_uuid(&mut self, v: &[u8; 16]) -> Result<()> {
        self.record("UUID", vec![Arg::Uuid(*v)])
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self, _output: Box<dyn io::Write>) {}
}

/// The replaying side of a [`Memo`].
pub struct MemoReader {
    inner: Rc<RefCell<Inner>>,
}

impl MemoReader {
    fn replay(&mut self, step: &'static str) -> Result<Vec<Arg>> {
        let mut m = self.inner.borrow_mut();
        let breakpoint = m.breakpoint;
        Inner::advance(&mut m.r, breakpoint)?;
        m.steps.push(step);
        let idx = m.r - 1;
        if idx >= m.values.len() {
            panic!("memo: read step {step} past the end of the recorded log");
        }
        let want = m.steps[idx];
        if step != want {
            panic!("memo: invalid step {step}, want {want}");
        }
        Ok(m.values[idx].clone())
    }

    fn replay_one(&mut self, step: &'static str) -> Result<Arg> {
        let mut args = self.replay(step)?;
        match args.pop() {
            Some(arg) if args.is_empty() => Ok(arg),
            _ => panic!("memo: step {step} recorded without its argument"),
        }
    }
}

impl Reader for MemoReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader> {
        match self.replay_one("MessageBegin")? {
            Arg::Message(h) => Ok(h),
            arg => panic!("memo: MessageBegin replayed {arg:?}"),
        }
    }

    fn read_message_end(&mut self) -> Result<()> {
        self.replay("MessageEnd").map(|_| ())
    }

    fn read_struct_begin(&mut self) -> Result<StructHeader> {
        match self.replay_one("StructBegin")? {
            Arg::Struct(h) => Ok(h),
            arg => panic!("memo: StructBegin replayed {arg:?}"),
        }
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.replay("StructEnd").map(|_| ())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader> {
        match self.replay_one("FieldBegin")? {
            Arg::Field(h) => Ok(h),
            arg => panic!("memo: FieldBegin replayed {arg:?}"),
        }
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.replay("FieldEnd").map(|_| ())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader> {
        match self.replay_one("MapBegin")? {
            Arg::Map(h) => Ok(h),
            arg => panic!("memo: MapBegin replayed {arg:?}"),
        }
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.replay("MapEnd").map(|_| ())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader> {
        match self.replay_one("SetBegin")? {
            Arg::Set(h) => Ok(h),
            arg => panic!("memo: SetBegin replayed {arg:?}"),
        }
    }

    fn read_set_end(&mut self) -> Result<()> {
        self.replay("SetEnd").map(|_| ())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader> {
        match self.replay_one("ListBegin")? {
            Arg::List(h) => Ok(h),
            arg => panic!("memo: ListBegin replayed {arg:?}"),
        }
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.replay("ListEnd").map(|_| ())
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.replay_one("Bool")? {
            Arg::Bool(v) => Ok(v),
            arg => panic!("memo: Bool replayed {arg:?}"),
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        match self.replay_one("Byte")? {
            Arg::Byte(v) => Ok(v),
            arg => panic!("memo: Byte replayed {arg:?}"),
        }
    }

    fn read_double(&mut self) -> Result<f64> {
        match self.replay_one("Double")? {
            Arg::Double(v) => Ok(v),
            arg => panic!("memo: Double replayed {arg:?}"),
        }
    }

    fn read_i16(&mut self) -> Result<i16> {
        match self.replay_one("I16")? {
            Arg::I16(v) => Ok(v),
            arg => panic!("memo: I16 replayed {arg:?}"),
        }
    }

    fn read_i32(&mut self) -> Result<i32> {
        match self.replay_one("I32")? {
            Arg::I32(v) => Ok(v),
            arg => panic!("memo: I32 replayed {arg:?}"),
        }
    }

    fn read_i64(&mut self) -> Result<i64> {
        match self.replay_one("I64")? {
            Arg::I64(v) => Ok(v),
            arg => panic!("memo: I64 replayed {arg:?}"),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.replay_one("String")? {
            Arg::Str(v) => Ok(v),
            arg => panic!("memo: String replayed {arg:?}"),
        }
    }

    fn read_bytes(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        match self.replay_one("Bytes")? {
            Arg::Bytes(v) => {
                buf.extend_from_slice(&v);
                Ok(())
            }
            arg => panic!("memo: Bytes replayed {arg:?}"),
        }
    }

    fn read_uuid(&mut self, v: &mut [u8; 16]) -> Result<()> {
        match self.replay_one("UUID")? {
            Arg::Uuid(got) => {
                *v = got;
                Ok(())
            }
            arg => panic!("memo: UUID replayed {arg:?}"),
        }
    }

    fn skip_string(&mut self) -> Result<()> {
        self.replay("String").map(|_| ())
    }

    fn skip_uuid(&mut self) -> Result<()> {
        self.replay("UUID").map(|_| ())
    }

    fn reset(&mut self, _input: Box<dyn io::Read>) {}
}
