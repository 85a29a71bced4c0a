//! Schema-independent value skipping.

use super::{Reader, Type};
use crate::error::{Error, Result};

/// Consumes exactly one value of type `t` from `r` by recursive descent,
/// discarding its contents. Used to step over unknown struct fields.
pub fn skip(r: &mut dyn Reader, t: Type) -> Result<()> {
    match t {
        Type::Bool => r.read_bool().map(|_| ()),
        Type::Byte => r.read_byte().map(|_| ()),
        Type::Double => r.read_double().map(|_| ()),
        Type::I16 => r.read_i16().map(|_| ()),
        Type::I32 => r.read_i32().map(|_| ()),
        Type::I64 => r.read_i64().map(|_| ()),
        Type::String => r.skip_string(),
        Type::Uuid => r.skip_uuid(),
        Type::Struct => {
            r.read_struct_begin()?;
            loop {
                let h = r.read_field_begin()?;
                if h.ty == Type::Stop {
                    break;
                }
                skip(r, h.ty)?;
                r.read_field_end()?;
            }
            r.read_struct_end()
        }
        Type::Map => {
            let h = r.read_map_begin()?;
            for _ in 0..h.size {
                skip(r, h.key)?;
                skip(r, h.value)?;
            }
            r.read_map_end()
        }
        Type::Set => {
            let h = r.read_set_begin()?;
            for _ in 0..h.size {
                skip(r, h.element)?;
            }
            r.read_set_end()
        }
        Type::List => {
            let h = r.read_list_begin()?;
            for _ in 0..h.size {
                skip(r, h.element)?;
            }
            r.read_list_end()
        }
        Type::Stop => Err(Error::InvalidType(t as u8)),
    }
}
