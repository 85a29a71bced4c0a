//! Value-to-wire mapping.
//!
//! This layer drives any [`wire::Writer`](crate::wire::Writer) or
//! [`wire::Reader`](crate::wire::Reader) from an in-memory value, through
//! per-type [`Descriptor`]s cached in a process-wide registry. There is no
//! per-call type inspection on the hot path: a descriptor is built once per
//! type, and marshalling is a walk over function pointers.
//!
//! Structs declare their field layout with [`reflect_struct!`](crate::reflect_struct):
//!
//! ```
//! use thriftwire::reflect_struct;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     name: String,
//!     id: i64,
//!     tags: Vec<String>,
//! }
//!
//! reflect_struct!(User {
//!     name => "1,required",
//!     id => "2",
//!     tags => "3",
//! });
//! ```
//!
//! Field tags follow the form `<id>[,<option>]*`. Non-required fields
//! whose value is the type's zero value (see [`IsZero`]) are elided when
//! marshalling; unknown fields found while unmarshalling are skipped.

mod descriptor;
mod fields;
mod zero;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

pub use descriptor::{Descriptor, FieldSpec, List, Reflect, Set};
pub use zero::IsZero;

use crate::error::Result;
use crate::wire::{Reader, Writer};

/// Serializes `value` into `w`.
///
/// # Errors
///
/// [`Error::Semantic`](crate::Error::Semantic), wrapping the failing wire
/// operation when the underlying writer fails.
pub fn marshal<T: Reflect>(w: &mut dyn Writer, value: &T) -> Result<()> {
    T::descriptor().marshal_value(w, value)
}

/// Deserializes from `r` into `value`.
///
/// Containers reuse the storage already present in `value` where they can;
/// unknown struct fields on the wire are skipped.
pub fn unmarshal<T: Reflect>(r: &mut dyn Reader, value: &mut T) -> Result<()> {
    let d = T::descriptor();
    d.unmarshal_value(r, value as &mut dyn Any, d.wire_type())
}

static REGISTRY: OnceLock<RwLock<HashMap<TypeId, &'static Descriptor>>> = OnceLock::new();

/// Looks up the cached descriptor for `T`, building and publishing it on
/// first use.
///
/// Concurrent first lookups may both build; the first store wins and the
/// duplicate is discarded, so the returned reference is pointer-identical
/// for a given type from then on.
pub fn lookup<T: 'static>(build: impl FnOnce() -> Descriptor) -> &'static Descriptor {
    let registry = REGISTRY.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();
    if let Some(d) = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .copied()
    {
        return d;
    }
    let fresh: &'static Descriptor = Box::leak(Box::new(build()));
    let mut map = registry.write().unwrap_or_else(PoisonError::into_inner);
    *map.entry(key).or_insert(fresh)
}
