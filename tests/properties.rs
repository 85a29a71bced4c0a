//! Property tests: error propagation at every suspension point via the
//! memo recorder's breakpoint, and randomized round-trips through both
//! codecs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::rc::Rc;

use bytes::Bytes;
use proptest::prelude::*;
use thriftwire::binary::BinaryProtocol;
use thriftwire::compact::CompactProtocol;
use thriftwire::memo::Memo;
use thriftwire::{
    marshal, reflect_struct, unmarshal, Error, List, Protocol, Reader, Reflect, Set, Writer,
};

// --- breakpoint sweep -------------------------------------------------------

/// For every prefix of the expected step list, aborting at the next step
/// must surface a semantic error tagged with that step's action, on both
/// the write and the read side. `FieldStop` in the expected list stands
/// for the synthetic `FieldBegin` recorded by `write_struct_end`.
fn sweep<T>(value: T, expected: &[&'static str])
where
    T: Reflect + Default,
{
    let steps: Vec<&'static str> = expected
        .iter()
        .map(|s| if *s == "FieldStop" { "FieldBegin" } else { *s })
        .collect();

    for n in (0..=steps.len()).rev() {
        let expect_error = n != steps.len();
        let memo = Memo::new();
        if expect_error {
            memo.set_breakpoint(n + 1);
        }

        let result = marshal(&mut memo.writer(), &value);
        if expect_error {
            let err = result.expect_err("marshal should hit the breakpoint");
            match &err {
                Error::Semantic(e) => assert_eq!(e.action, "marshal"),
                other => panic!("expected semantic error, got {other:?}"),
            }
            let action = err.wire_action().expect("missing wire action");
            let want = format!("Write{}", steps[n]);
            assert!(
                action == want || action == "WriteStructEnd",
                "write action {action}, want {want}"
            );
        } else {
            result.expect("marshal without breakpoint");
        }

        let write_log = memo.steps();
        assert_eq!(write_log, &steps[..n], "write log mismatch at {n}");

        let mut out = T::default();
        let result = unmarshal(&mut memo.reader(), &mut out);
        if expect_error {
            let err = result.expect_err("unmarshal should hit the breakpoint");
            match &err {
                Error::Semantic(e) => assert_eq!(e.action, "unmarshal"),
                other => panic!("expected semantic error, got {other:?}"),
            }
            let action = err.wire_action().expect("missing wire action");
            assert_eq!(action, format!("Read{}", steps[n]), "read action at {n}");
        } else {
            result.expect("unmarshal without breakpoint");
        }

        // The read log replays the write log verbatim.
        let full = memo.steps();
        assert_eq!(&full[write_log.len()..], &write_log[..]);
    }
}

#[derive(Debug, Default, PartialEq)]
struct RequiredString {
    value: String,
}
reflect_struct!(RequiredString { value => "1,required" });

#[derive(Debug, Default, PartialEq)]
struct Node {
    label: String,
    items: Vec<Box<Node>>,
}
reflect_struct!(Node {
    label => "1",
    items => "2",
});

#[test]
fn test_breakpoint_sweep_scalars() {
    sweep(true, &["Bool"]);
    sweep(i8::MAX, &["Byte"]);
    sweep(i16::MAX, &["I16"]);
    sweep(i32::MAX, &["I32"]);
    sweep(i64::MAX, &["I64"]);
    sweep(u8::MAX, &["Byte"]);
    sweep(u16::MAX, &["I16"]);
    sweep(u32::MAX, &["I32"]);
    sweep(u64::MAX, &["I64"]);
    sweep(f64::MAX, &["Double"]);
    sweep("hello, world!".to_string(), &["String"]);
    sweep(Bytes::from_static(b"hello"), &["Bytes"]);
    sweep([7u8; 16], &["UUID"]);
}

#[test]
fn test_breakpoint_sweep_containers() {
    sweep(
        BTreeMap::from([(false, false), (true, true)]),
        &["MapBegin", "Bool", "Bool", "Bool", "Bool", "MapEnd"],
    );
    sweep(
        Set(vec![0f32, 1.0, 0.5]),
        &["SetBegin", "Double", "Double", "Double", "SetEnd"],
    );
    sweep(
        List(vec![false, true, false]),
        &["ListBegin", "Bool", "Bool", "Bool", "ListEnd"],
    );
    sweep(
        vec![Some("hello".to_string()), Some("world".to_string()), None],
        &["ListBegin", "String", "String", "String", "ListEnd"],
    );
    sweep(BTreeMap::<String, String>::new(), &["MapBegin", "MapEnd"]);
    sweep(Vec::<String>::new(), &["ListBegin", "ListEnd"]);
}

#[test]
fn test_breakpoint_sweep_structs() {
    // A required field is emitted even when zero.
    sweep(
        RequiredString::default(),
        &[
            "StructBegin",
            "FieldBegin",
            "String",
            "FieldEnd",
            "FieldStop",
            "StructEnd",
        ],
    );

    sweep(
        Node {
            label: "hello, world!".into(),
            items: vec![Box::new(Node::default())],
        },
        &[
            "StructBegin",
            "FieldBegin",
            "String",
            "FieldEnd",
            "FieldBegin",
            "ListBegin",
            "StructBegin",
            "FieldStop",
            "StructEnd",
            "ListEnd",
            "FieldEnd",
            "FieldStop",
            "StructEnd",
        ],
    );
}

// --- randomized round-trips -------------------------------------------------

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

#[derive(Debug, Clone, Default, PartialEq)]
struct Everything {
    flag: bool,
    small: i16,
    wide: i64,
    real: f64,
    text: String,
    tags: Vec<String>,
}
reflect_struct!(Everything {
    flag => "1",
    small => "2",
    wide => "3",
    real => "4",
    text => "5",
    tags => "6",
});

fn round_trip<T>(p: &dyn Protocol, value: &T) -> T
where
    T: Reflect + Default,
{
    let sink = SharedSink::default();
    let mut w = p.new_writer(Box::new(sink.clone()));
    marshal(&mut *w, value).unwrap();
    w.flush().unwrap();
    let bytes = sink.0.borrow().clone();

    let mut r = p.new_reader(Box::new(Cursor::new(bytes)));
    let mut out = T::default();
    unmarshal(&mut *r, &mut out).unwrap();
    out
}

proptest! {
    #[test]
    fn prop_struct_round_trips_both_codecs(
        flag in any::<bool>(),
        small in any::<i16>(),
        wide in any::<i64>(),
        real in -1e300f64..1e300f64,
        text in ".{0,48}",
        tags in prop::collection::vec(".{0,16}", 0..8),
    ) {
        let value = Everything { flag, small, wide, real, text, tags };
        prop_assert_eq!(round_trip(&CompactProtocol, &value), value.clone());
        prop_assert_eq!(round_trip(&BinaryProtocol::new(), &value), value);
    }

    #[test]
    fn prop_compact_integers_round_trip(v in any::<i64>(), s in any::<i16>()) {
        let sink = SharedSink::default();
        let mut w = CompactProtocol.new_writer(Box::new(sink.clone()));
        w.write_i64(v).unwrap();
        w.write_i16(s).unwrap();
        w.flush().unwrap();
        let bytes = sink.0.borrow().clone();

        let mut r = CompactProtocol.new_reader(Box::new(Cursor::new(bytes)));
        prop_assert_eq!(r.read_i64().unwrap(), v);
        prop_assert_eq!(r.read_i16().unwrap(), s);
    }

    #[test]
    fn prop_binary_strings_round_trip(text in ".{0,200}") {
        let sink = SharedSink::default();
        let mut w = BinaryProtocol::new().new_writer(Box::new(sink.clone()));
        w.write_string(&text).unwrap();
        w.flush().unwrap();
        let bytes = sink.0.borrow().clone();

        let mut r = BinaryProtocol::new().new_reader(Box::new(Cursor::new(bytes)));
        prop_assert_eq!(r.read_string().unwrap(), text);
    }
}
