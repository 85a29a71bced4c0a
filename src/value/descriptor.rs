//! Type descriptors: the cached bridge between in-memory values and the
//! wire abstraction.
//!
//! A [`Descriptor`] carries a wire type and a pair of erased marshal and
//! unmarshal functions. The functions are monomorphized generic shims that
//! downcast their `dyn Any` argument exactly once at entry, so the hot
//! path is a function-pointer call with no per-value type inspection.
//! Struct descriptors additionally carry a field table, introspected once
//! behind a `OnceLock` on first use.
//!
//! Field descriptors are stored as `fn() -> &'static Descriptor` thunks
//! and resolved on use, never at construction — that is what lets struct
//! types recurse (through `Option<Box<T>>`) without the registry chasing
//! its own tail.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::OnceLock;

use bytes::Bytes;

use super::fields::{build_table, FieldTable};
use super::lookup;
use super::zero::IsZero;
use crate::error::{Error, Result, SemanticError};
use crate::wire::{
    skip, FieldHeader, ListHeader, MapHeader, Reader, SetHeader, StructHeader, Type, Writer,
};

/// A type that knows its wire descriptor.
///
/// Implemented by the crate for scalars, `String`, [`Bytes`] (binary),
/// `[u8; 16]` (UUID), `Vec<T>`, [`Set<T>`]/[`List<T>`], `HashMap` and
/// `BTreeMap`, and the transparent wrappers `Option<T>` and `Box<T>`.
/// Implement it for structs with [`reflect_struct!`](crate::reflect_struct).
pub trait Reflect: 'static {
    /// The cached descriptor for this type. Repeated calls return a
    /// pointer-identical value.
    fn descriptor() -> &'static Descriptor;
}

type MarshalFn = fn(&Descriptor, &mut dyn Writer, &dyn Any) -> Result<()>;
type UnmarshalFn = fn(&Descriptor, &mut dyn Reader, &mut dyn Any, Type) -> Result<()>;

/// A cached per-type record driving codecs from in-memory values.
pub struct Descriptor {
    wire_type: Type,
    type_name: &'static str,
    marshal: MarshalFn,
    unmarshal: UnmarshalFn,
    /// `StructData<T>` for struct descriptors, absent otherwise.
    fields: Option<Box<dyn Any + Send + Sync>>,
}

impl Descriptor {
    /// The wire type values of this descriptor encode as.
    #[inline]
    pub fn wire_type(&self) -> Type {
        self.wire_type
    }

    /// The user type name, used in semantic errors.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Writes `value` (which must be the descriptor's type) to `w`.
    pub fn marshal_value(&self, w: &mut dyn Writer, value: &dyn Any) -> Result<()> {
        (self.marshal)(self, w, value)
    }

    /// Reads a value of wire type `wt` from `r` into `value`.
    pub fn unmarshal_value(
        &self,
        r: &mut dyn Reader,
        value: &mut dyn Any,
        wt: Type,
    ) -> Result<()> {
        (self.unmarshal)(self, r, value, wt)
    }

    /// Builds a struct descriptor from a field spec list. Prefer the
    /// [`reflect_struct!`](crate::reflect_struct) macro, which generates
    /// the specs from field names and tags.
    pub fn for_struct<T: 'static>(name: &'static str, specs: Vec<FieldSpec<T>>) -> Descriptor {
        Descriptor {
            wire_type: Type::Struct,
            type_name: name,
            marshal: marshal_struct::<T>,
            unmarshal: unmarshal_struct::<T>,
            fields: Some(Box::new(StructData {
                specs,
                table: OnceLock::new(),
            })),
        }
    }

    fn semantic(
        &self,
        action: &'static str,
        thrift_type: Option<Type>,
        source: Option<Error>,
    ) -> Error {
        SemanticError {
            action,
            thrift_type,
            type_name: Some(self.type_name),
            source: source.map(Box::new),
        }
        .boxed()
    }

    /// Wraps a failed wire call with its action name, then as semantic.
    fn wire_err(
        &self,
        action: &'static str,
        thrift_type: Type,
        wire_action: &'static str,
        err: Error,
    ) -> Error {
        self.semantic(action, Some(thrift_type), Some(Error::wire(wire_action, err)))
    }

    /// A declared/encoded type mismatch.
    fn mismatch(&self, wt: Type) -> Error {
        self.semantic("unmarshal", Some(wt), None)
    }

    fn struct_data<T: 'static>(&self, action: &'static str) -> Result<&StructData<T>> {
        self.fields
            .as_ref()
            .and_then(|b| b.downcast_ref::<StructData<T>>())
            .ok_or_else(|| self.semantic(action, None, None))
    }
}

fn cast<'a, T: 'static>(d: &Descriptor, action: &'static str, v: &'a dyn Any) -> Result<&'a T> {
    v.downcast_ref::<T>()
        .ok_or_else(|| d.semantic(action, None, None))
}

fn cast_mut<'a, T: 'static>(
    d: &Descriptor,
    action: &'static str,
    v: &'a mut dyn Any,
) -> Result<&'a mut T> {
    match v.downcast_mut::<T>() {
        Some(v) => Ok(v),
        None => Err(d.semantic(action, None, None)),
    }
}

// --- scalars ---------------------------------------------------------------

macro_rules! scalar_reflect {
    (
        $ty:ty, $wire:expr,
        write($w:ident, $v:ident) $write:block as $waction:literal,
        read($r:ident) $read:block as $raction:literal
    ) => {
        impl Reflect for $ty {
            fn descriptor() -> &'static Descriptor {
                lookup::<$ty>(|| Descriptor {
                    wire_type: $wire,
                    type_name: stringify!($ty),
                    marshal: |d, w, v| {
                        let $v: &$ty = cast(d, "marshal", v)?;
                        let $w = w;
                        $write.map_err(|e| d.wire_err("marshal", $wire, $waction, e))
                    },
                    unmarshal: |d, r, v, wt| {
                        if wt != $wire {
                            return Err(d.mismatch(wt));
                        }
                        let out: &mut $ty = cast_mut(d, "unmarshal", v)?;
                        let $r = r;
                        *out = $read.map_err(|e| d.wire_err("unmarshal", $wire, $raction, e))?;
                        Ok(())
                    },
                    fields: None,
                })
            }
        }
    };
}

scalar_reflect!(bool, Type::Bool,
    write(w, v) { w.write_bool(*v) } as "WriteBool",
    read(r) { r.read_bool() } as "ReadBool");

scalar_reflect!(i8, Type::Byte,
    write(w, v) { w.write_byte(*v as u8) } as "WriteByte",
    read(r) { r.read_byte().map(|b| b as i8) } as "ReadByte");

scalar_reflect!(u8, Type::Byte,
    write(w, v) { w.write_byte(*v) } as "WriteByte",
    read(r) { r.read_byte() } as "ReadByte");

scalar_reflect!(i16, Type::I16,
    write(w, v) { w.write_i16(*v) } as "WriteI16",
    read(r) { r.read_i16() } as "ReadI16");

scalar_reflect!(u16, Type::I16,
    write(w, v) { w.write_i16(*v as i16) } as "WriteI16",
    read(r) { r.read_i16().map(|b| b as u16) } as "ReadI16");

scalar_reflect!(i32, Type::I32,
    write(w, v) { w.write_i32(*v) } as "WriteI32",
    read(r) { r.read_i32() } as "ReadI32");

scalar_reflect!(u32, Type::I32,
    write(w, v) { w.write_i32(*v as i32) } as "WriteI32",
    read(r) { r.read_i32().map(|b| b as u32) } as "ReadI32");

scalar_reflect!(i64, Type::I64,
    write(w, v) { w.write_i64(*v) } as "WriteI64",
    read(r) { r.read_i64() } as "ReadI64");

scalar_reflect!(u64, Type::I64,
    write(w, v) { w.write_i64(*v as i64) } as "WriteI64",
    read(r) { r.read_i64().map(|b| b as u64) } as "ReadI64");

scalar_reflect!(f32, Type::Double,
    write(w, v) { w.write_double(f64::from(*v)) } as "WriteDouble",
    read(r) { r.read_double().map(|b| b as f32) } as "ReadDouble");

scalar_reflect!(f64, Type::Double,
    write(w, v) { w.write_double(*v) } as "WriteDouble",
    read(r) { r.read_double() } as "ReadDouble");

scalar_reflect!(String, Type::String,
    write(w, v) { w.write_string(v) } as "WriteString",
    read(r) { r.read_string() } as "ReadString");

impl Reflect for Bytes {
    fn descriptor() -> &'static Descriptor {
        lookup::<Bytes>(|| Descriptor {
            wire_type: Type::String,
            type_name: "Bytes",
            marshal: |d, w, v| {
                let v: &Bytes = cast(d, "marshal", v)?;
                w.write_bytes(v)
                    .map_err(|e| d.wire_err("marshal", Type::String, "WriteBytes", e))
            },
            unmarshal: |d, r, v, wt| {
                if wt != Type::String {
                    return Err(d.mismatch(wt));
                }
                let out: &mut Bytes = cast_mut(d, "unmarshal", v)?;
                let mut buf = Vec::new();
                r.read_bytes(&mut buf)
                    .map_err(|e| d.wire_err("unmarshal", Type::String, "ReadBytes", e))?;
                *out = Bytes::from(buf);
                Ok(())
            },
            fields: None,
        })
    }
}

impl Reflect for [u8; 16] {
    fn descriptor() -> &'static Descriptor {
        lookup::<[u8; 16]>(|| Descriptor {
            wire_type: Type::Uuid,
            type_name: "[u8; 16]",
            marshal: |d, w, v| {
                let v: &[u8; 16] = cast(d, "marshal", v)?;
                w.write_uuid(v)
                    .map_err(|e| d.wire_err("marshal", Type::Uuid, "WriteUUID", e))
            },
            unmarshal: |d, r, v, wt| {
                if wt != Type::Uuid {
                    return Err(d.mismatch(wt));
                }
                let out: &mut [u8; 16] = cast_mut(d, "unmarshal", v)?;
                r.read_uuid(out)
                    .map_err(|e| d.wire_err("unmarshal", Type::Uuid, "ReadUUID", e))
            },
            fields: None,
        })
    }
}

// --- sequences -------------------------------------------------------------

/// A `Vec<T>` that encodes as a Thrift set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set<T>(pub Vec<T>);

/// A `Vec<T>` that encodes as a Thrift list. Plain `Vec<T>` already does;
/// the newtype exists for symmetry with [`Set`] in schemas that spell the
/// container out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List<T>(pub Vec<T>);

impl<T> std::ops::Deref for Set<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Set<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> std::ops::Deref for List<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> std::ops::DerefMut for List<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> From<Vec<T>> for Set<T> {
    fn from(v: Vec<T>) -> Self {
        Set(v)
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(v: Vec<T>) -> Self {
        List(v)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SeqKind {
    Set,
    List,
}

impl SeqKind {
    fn wire_type(self) -> Type {
        match self {
            SeqKind::Set => Type::Set,
            SeqKind::List => Type::List,
        }
    }

    fn write_begin(self, w: &mut dyn Writer, element: Type, size: usize) -> Result<()> {
        match self {
            SeqKind::Set => w.write_set_begin(SetHeader { element, size }),
            SeqKind::List => w.write_list_begin(ListHeader { element, size }),
        }
    }

    fn write_end(self, w: &mut dyn Writer) -> Result<()> {
        match self {
            SeqKind::Set => w.write_set_end(),
            SeqKind::List => w.write_list_end(),
        }
    }

    fn read_begin(self, r: &mut dyn Reader) -> Result<SetHeader> {
        match self {
            SeqKind::Set => r.read_set_begin(),
            SeqKind::List => r.read_list_begin().map(SetHeader::from),
        }
    }

    fn read_end(self, r: &mut dyn Reader) -> Result<()> {
        match self {
            SeqKind::Set => r.read_set_end(),
            SeqKind::List => r.read_list_end(),
        }
    }

    fn action(self, op: &'static str) -> &'static str {
        match (self, op) {
            (SeqKind::Set, "WriteBegin") => "WriteSetBegin",
            (SeqKind::Set, "WriteEnd") => "WriteSetEnd",
            (SeqKind::Set, "ReadBegin") => "ReadSetBegin",
            (SeqKind::Set, "ReadEnd") => "ReadSetEnd",
            (SeqKind::List, "WriteBegin") => "WriteListBegin",
            (SeqKind::List, "WriteEnd") => "WriteListEnd",
            (SeqKind::List, "ReadBegin") => "ReadListBegin",
            _ => "ReadListEnd",
        }
    }
}

fn marshal_seq<T: Reflect>(
    kind: SeqKind,
    d: &Descriptor,
    w: &mut dyn Writer,
    items: &[T],
) -> Result<()> {
    let ed = T::descriptor();
    let wt = kind.wire_type();
    if ed.wire_type == Type::Stop {
        return Err(d.semantic("marshal", Some(wt), None));
    }
    kind.write_begin(w, ed.wire_type, items.len())
        .map_err(|e| d.wire_err("marshal", wt, kind.action("WriteBegin"), e))?;
    for item in items {
        ed.marshal_value(w, item)?;
    }
    kind.write_end(w)
        .map_err(|e| d.wire_err("marshal", wt, kind.action("WriteEnd"), e))
}

/// Unmarshals a sequence in place: existing slots are reused (and zeroed),
/// the vector grows on demand, and on error the processed prefix is kept.
fn unmarshal_seq<T: Reflect + Default>(
    kind: SeqKind,
    d: &Descriptor,
    r: &mut dyn Reader,
    items: &mut Vec<T>,
    wt: Type,
) -> Result<()> {
    if wt != kind.wire_type() {
        return Err(d.mismatch(wt));
    }
    let h = kind
        .read_begin(r)
        .map_err(|e| d.wire_err("unmarshal", wt, kind.action("ReadBegin"), e))?;
    let ed = T::descriptor();
    let mut i = 0;
    while i < h.size {
        if i < items.len() {
            items[i] = T::default();
        } else {
            items.push(T::default());
        }
        i += 1;
        if let Err(e) = ed.unmarshal_value(r, &mut items[i - 1], h.element) {
            items.truncate(i);
            return Err(e);
        }
    }
    items.truncate(h.size);
    kind.read_end(r)
        .map_err(|e| d.wire_err("unmarshal", wt, kind.action("ReadEnd"), e))
}

fn marshal_vec<T: Reflect + Default>(
    d: &Descriptor,
    w: &mut dyn Writer,
    v: &dyn Any,
) -> Result<()> {
    marshal_seq(SeqKind::List, d, w, cast::<Vec<T>>(d, "marshal", v)?)
}

fn unmarshal_vec<T: Reflect + Default>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    unmarshal_seq(SeqKind::List, d, r, cast_mut::<Vec<T>>(d, "unmarshal", v)?, wt)
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn descriptor() -> &'static Descriptor {
        lookup::<Vec<T>>(|| Descriptor {
            wire_type: Type::List,
            type_name: std::any::type_name::<Vec<T>>(),
            marshal: marshal_vec::<T>,
            unmarshal: unmarshal_vec::<T>,
            fields: None,
        })
    }
}

fn marshal_list<T: Reflect + Default>(
    d: &Descriptor,
    w: &mut dyn Writer,
    v: &dyn Any,
) -> Result<()> {
    marshal_seq(SeqKind::List, d, w, &cast::<List<T>>(d, "marshal", v)?.0)
}

fn unmarshal_list<T: Reflect + Default>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    unmarshal_seq(
        SeqKind::List,
        d,
        r,
        &mut cast_mut::<List<T>>(d, "unmarshal", v)?.0,
        wt,
    )
}

impl<T: Reflect + Default> Reflect for List<T> {
    fn descriptor() -> &'static Descriptor {
        lookup::<List<T>>(|| Descriptor {
            wire_type: Type::List,
            type_name: std::any::type_name::<List<T>>(),
            marshal: marshal_list::<T>,
            unmarshal: unmarshal_list::<T>,
            fields: None,
        })
    }
}

fn marshal_set<T: Reflect + Default>(
    d: &Descriptor,
    w: &mut dyn Writer,
    v: &dyn Any,
) -> Result<()> {
    marshal_seq(SeqKind::Set, d, w, &cast::<Set<T>>(d, "marshal", v)?.0)
}

fn unmarshal_set<T: Reflect + Default>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    unmarshal_seq(
        SeqKind::Set,
        d,
        r,
        &mut cast_mut::<Set<T>>(d, "unmarshal", v)?.0,
        wt,
    )
}

impl<T: Reflect + Default> Reflect for Set<T> {
    fn descriptor() -> &'static Descriptor {
        lookup::<Set<T>>(|| Descriptor {
            wire_type: Type::Set,
            type_name: std::any::type_name::<Set<T>>(),
            marshal: marshal_set::<T>,
            unmarshal: unmarshal_set::<T>,
            fields: None,
        })
    }
}

// --- maps ------------------------------------------------------------------

/// Map access shared by the supported map types.
trait MapLike<K, V>: 'static {
    fn len(&self) -> usize;
    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a>;
    /// The slot for `key`, reusing an existing entry's storage.
    fn slot(&mut self, key: K) -> &mut V;
}

impl<K: Eq + Hash + 'static, V: Default + 'static> MapLike<K, V> for HashMap<K, V> {
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> {
        Box::new(self.iter())
    }

    fn slot(&mut self, key: K) -> &mut V {
        self.entry(key).or_default()
    }
}

impl<K: Ord + 'static, V: Default + 'static> MapLike<K, V> for BTreeMap<K, V> {
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> {
        Box::new(self.iter())
    }

    fn slot(&mut self, key: K) -> &mut V {
        self.entry(key).or_default()
    }
}

fn marshal_map<K: Reflect, V: Reflect, M: MapLike<K, V>>(
    d: &Descriptor,
    w: &mut dyn Writer,
    v: &dyn Any,
) -> Result<()> {
    let map = cast::<M>(d, "marshal", v)?;
    let kd = K::descriptor();
    let vd = V::descriptor();
    if kd.wire_type == Type::Stop || vd.wire_type == Type::Stop {
        return Err(d.semantic("marshal", Some(Type::Map), None));
    }
    w.write_map_begin(MapHeader {
        key: kd.wire_type,
        value: vd.wire_type,
        size: map.len(),
    })
    .map_err(|e| d.wire_err("marshal", Type::Map, "WriteMapBegin", e))?;
    for (k, v) in map.entries() {
        kd.marshal_value(w, k)?;
        vd.marshal_value(w, v)?;
    }
    w.write_map_end()
        .map_err(|e| d.wire_err("marshal", Type::Map, "WriteMapEnd", e))
}

fn unmarshal_map<K: Reflect + Default, V: Reflect + Default, M: MapLike<K, V>>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    if wt != Type::Map {
        return Err(d.mismatch(wt));
    }
    let map = cast_mut::<M>(d, "unmarshal", v)?;
    let h = r
        .read_map_begin()
        .map_err(|e| d.wire_err("unmarshal", Type::Map, "ReadMapBegin", e))?;
    let kd = K::descriptor();
    let vd = V::descriptor();
    for _ in 0..h.size {
        let mut key = K::default();
        kd.unmarshal_value(r, &mut key, h.key)?;
        let slot = map.slot(key);
        vd.unmarshal_value(r, slot, h.value)?;
    }
    r.read_map_end()
        .map_err(|e| d.wire_err("unmarshal", Type::Map, "ReadMapEnd", e))
}

impl<K: Reflect + Eq + Hash + Default, V: Reflect + Default> Reflect for HashMap<K, V> {
    fn descriptor() -> &'static Descriptor {
        lookup::<HashMap<K, V>>(|| Descriptor {
            wire_type: Type::Map,
            type_name: std::any::type_name::<HashMap<K, V>>(),
            marshal: marshal_map::<K, V, HashMap<K, V>>,
            unmarshal: unmarshal_map::<K, V, HashMap<K, V>>,
            fields: None,
        })
    }
}

impl<K: Reflect + Ord + Default, V: Reflect + Default> Reflect for BTreeMap<K, V> {
    fn descriptor() -> &'static Descriptor {
        lookup::<BTreeMap<K, V>>(|| Descriptor {
            wire_type: Type::Map,
            type_name: std::any::type_name::<BTreeMap<K, V>>(),
            marshal: marshal_map::<K, V, BTreeMap<K, V>>,
            unmarshal: unmarshal_map::<K, V, BTreeMap<K, V>>,
            fields: None,
        })
    }
}

// --- pointer and optional wrappers -----------------------------------------

fn marshal_option<T: Reflect + Default>(
    d: &Descriptor,
    w: &mut dyn Writer,
    v: &dyn Any,
) -> Result<()> {
    let opt = cast::<Option<T>>(d, "marshal", v)?;
    match opt {
        Some(inner) => T::descriptor().marshal_value(w, inner),
        // A missing value marshals as the zero value, like a nil pointer.
        None => T::descriptor().marshal_value(w, &T::default()),
    }
}

fn unmarshal_option<T: Reflect + Default>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    let opt = cast_mut::<Option<T>>(d, "unmarshal", v)?;
    let inner = opt.get_or_insert_with(T::default);
    T::descriptor().unmarshal_value(r, inner, wt)
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn descriptor() -> &'static Descriptor {
        lookup::<Option<T>>(|| Descriptor {
            wire_type: T::descriptor().wire_type,
            type_name: std::any::type_name::<Option<T>>(),
            marshal: marshal_option::<T>,
            unmarshal: unmarshal_option::<T>,
            fields: None,
        })
    }
}

fn marshal_box<T: Reflect>(d: &Descriptor, w: &mut dyn Writer, v: &dyn Any) -> Result<()> {
    let boxed = cast::<Box<T>>(d, "marshal", v)?;
    T::descriptor().marshal_value(w, &**boxed)
}

fn unmarshal_box<T: Reflect>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    let boxed = cast_mut::<Box<T>>(d, "unmarshal", v)?;
    T::descriptor().unmarshal_value(r, &mut **boxed, wt)
}

impl<T: Reflect> Reflect for Box<T> {
    fn descriptor() -> &'static Descriptor {
        lookup::<Box<T>>(|| Descriptor {
            wire_type: T::descriptor().wire_type,
            type_name: std::any::type_name::<Box<T>>(),
            marshal: marshal_box::<T>,
            unmarshal: unmarshal_box::<T>,
            fields: None,
        })
    }
}

// --- structs ---------------------------------------------------------------

type Getter<T> = Box<dyn for<'a> Fn(&'a T) -> &'a (dyn Any + 'static) + Send + Sync>;
type GetterMut<T> = Box<dyn for<'a> Fn(&'a mut T) -> &'a mut (dyn Any + 'static) + Send + Sync>;

/// One declared struct field: its tag, name, deferred descriptor, and the
/// erased accessors generated by [`reflect_struct!`](crate::reflect_struct).
pub struct FieldSpec<T> {
    pub(crate) tag: &'static str,
    pub(crate) name: &'static str,
    pub(crate) desc: fn() -> &'static Descriptor,
    get: Getter<T>,
    get_mut: GetterMut<T>,
    is_zero: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: 'static> FieldSpec<T> {
    /// The two accessors fix the field type `F`; everything type-specific
    /// is captured here so the struct walkers stay fully erased.
    pub fn new<F: Reflect + IsZero>(
        tag: &'static str,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> FieldSpec<T> {
        FieldSpec {
            tag,
            name,
            desc: F::descriptor,
            get: Box::new(move |v: &T| get(v) as &dyn Any),
            get_mut: Box::new(move |v: &mut T| get_mut(v) as &mut dyn Any),
            is_zero: Box::new(move |v: &T| get(v).is_zero()),
        }
    }
}

struct StructData<T> {
    specs: Vec<FieldSpec<T>>,
    table: OnceLock<std::result::Result<FieldTable, super::fields::FieldError>>,
}

impl<T: 'static> StructData<T> {
    fn table(&self, d: &Descriptor, action: &'static str) -> Result<&FieldTable> {
        let built = self.table.get_or_init(|| {
            tracing::debug!(ty = d.type_name, "building struct field table");
            build_table(&self.specs)
        });
        match built {
            Ok(table) => Ok(table),
            Err(e) => Err(SemanticError {
                action,
                thrift_type: None,
                type_name: Some(d.type_name),
                source: Some(Box::new(Error::Io(std::io::Error::other(
                    e.message.clone(),
                )))),
            }
            .boxed()),
        }
    }
}

fn marshal_struct<T: 'static>(d: &Descriptor, w: &mut dyn Writer, v: &dyn Any) -> Result<()> {
    let value = cast::<T>(d, "marshal", v)?;
    let data = d.struct_data::<T>("marshal")?;
    let table = data.table(d, "marshal")?;
    w.write_struct_begin(StructHeader {
        name: Some(d.type_name),
    })
    .map_err(|e| d.wire_err("marshal", Type::Struct, "WriteStructBegin", e))?;
    for entry in &table.order {
        let spec = &data.specs[entry.spec];
        let fd = (spec.desc)();
        if fd.wire_type == Type::Stop {
            return Err(d.semantic("marshal", None, None));
        }
        if !entry.required && (spec.is_zero)(value) {
            continue;
        }
        w.write_field_begin(FieldHeader {
            name: Some(spec.name),
            ty: fd.wire_type,
            id: entry.id,
        })
        .map_err(|e| d.wire_err("marshal", Type::Struct, "WriteFieldBegin", e))?;
        fd.marshal_value(w, (spec.get)(value))?;
        w.write_field_end()
            .map_err(|e| d.wire_err("marshal", Type::Struct, "WriteFieldEnd", e))?;
    }
    w.write_struct_end()
        .map_err(|e| d.wire_err("marshal", Type::Struct, "WriteStructEnd", e))
}

fn unmarshal_struct<T: 'static>(
    d: &Descriptor,
    r: &mut dyn Reader,
    v: &mut dyn Any,
    wt: Type,
) -> Result<()> {
    if wt != Type::Struct {
        return Err(d.mismatch(wt));
    }
    let value = cast_mut::<T>(d, "unmarshal", v)?;
    let data = d.struct_data::<T>("unmarshal")?;
    let table = data.table(d, "unmarshal")?;
    r.read_struct_begin()
        .map_err(|e| d.wire_err("unmarshal", Type::Struct, "ReadStructBegin", e))?;
    loop {
        let h = r
            .read_field_begin()
            .map_err(|e| d.wire_err("unmarshal", Type::Struct, "ReadFieldBegin", e))?;
        if h.ty == Type::Stop {
            break;
        }
        match table.by_id.get(&h.id) {
            None => skip(r, h.ty)?,
            Some(&idx) => {
                let spec = &data.specs[table.order[idx].spec];
                let fd = (spec.desc)();
                fd.unmarshal_value(r, (spec.get_mut)(value), h.ty)?;
            }
        }
        r.read_field_end()
            .map_err(|e| d.wire_err("unmarshal", Type::Struct, "ReadFieldEnd", e))?;
    }
    r.read_struct_end()
        .map_err(|e| d.wire_err("unmarshal", Type::Struct, "ReadStructEnd", e))
}

/// Implements [`Reflect`] and [`IsZero`] for a struct from a list of
/// `field => "tag"` pairs.
///
/// The tag grammar is `<id>[,<option>]*`; see the
/// [`value`](crate::value) module docs. A tag of `"-"` ignores the field.
///
/// ```
/// use thriftwire::reflect_struct;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Account {
///     name: String,
///     balance: i64,
///     cached: bool,
/// }
///
/// reflect_struct!(Account {
///     name => "1,required",
///     balance => "2",
///     cached => "-",
/// });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($ty:ty { $($field:ident => $tag:literal),* $(,)? }) => {
        impl $crate::value::Reflect for $ty {
            fn descriptor() -> &'static $crate::value::Descriptor {
                $crate::value::lookup::<$ty>(|| {
                    $crate::value::Descriptor::for_struct::<$ty>(
                        stringify!($ty),
                        vec![
                            $($crate::value::FieldSpec::new(
                                $tag,
                                stringify!($field),
                                |v: &$ty| &v.$field,
                                |v: &mut $ty| &mut v.$field,
                            ),)*
                        ],
                    )
                })
            }
        }

        impl $crate::value::IsZero for $ty {
            fn is_zero(&self) -> bool {
                true $(&& $crate::value::IsZero::is_zero(&self.$field))*
            }
        }
    };
}
