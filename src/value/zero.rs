//! The zero-value predicate used to elide non-required struct fields.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use super::{List, Set};

/// Reports whether a value is its type's zero value.
///
/// Marshalling skips non-required struct fields whose value is zero. The
/// crate implements this for every [`Reflect`](super::Reflect) type it
/// ships; user structs get an implementation from
/// [`reflect_struct!`](crate::reflect_struct) (all fields zero), and any
/// type may override it by hand to customize elision.
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

macro_rules! int_is_zero {
    ($($ty:ty),*) => {
        $(impl IsZero for $ty {
            #[inline]
            fn is_zero(&self) -> bool {
                *self == 0
            }
        })*
    };
}

int_is_zero!(i8, u8, i16, u16, i32, u32, i64, u64);

impl IsZero for bool {
    #[inline]
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl IsZero for f32 {
    #[inline]
    fn is_zero(&self) -> bool {
        self.to_bits() == 0
    }
}

impl IsZero for f64 {
    #[inline]
    fn is_zero(&self) -> bool {
        self.to_bits() == 0
    }
}

impl IsZero for String {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for Bytes {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl IsZero for [u8; 16] {
    #[inline]
    fn is_zero(&self) -> bool {
        *self == [0; 16]
    }
}

impl<T> IsZero for Vec<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for Set<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> IsZero for List<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> IsZero for HashMap<K, V> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsZero for BTreeMap<K, V> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsZero for Option<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: IsZero> IsZero for Box<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}
