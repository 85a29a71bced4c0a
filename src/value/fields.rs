//! Field-tag parsing and struct field tables.
//!
//! A field tag has the form `<id>[,<option>]*`: a decimal `i16` field id
//! followed by comma-separated options. `required` is the only known
//! option; the literal tag `-` marks a field as ignored. Options that
//! merely resemble a known option (case-insensitive, underscores stripped)
//! are rejected to catch typos, as are duplicates. Other unknown options
//! are ignored for forward compatibility.

use std::collections::{HashMap, HashSet};

use super::descriptor::FieldSpec;

/// Options parsed from a single field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldOptions {
    pub id: i16,
    pub required: bool,
}

/// A tag-parse failure, cached alongside the field table and replayed as a
/// semantic error on every use of the descriptor.
#[derive(Debug, Clone)]
pub(crate) struct FieldError {
    pub message: String,
}

/// One serializable field, in id order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldEntry {
    /// Index into the descriptor's spec list.
    pub spec: usize,
    pub id: i16,
    pub required: bool,
}

/// The id-ordered, id-indexed field table of a struct descriptor.
#[derive(Debug)]
pub(crate) struct FieldTable {
    pub order: Vec<FieldEntry>,
    pub by_id: HashMap<i16, usize>,
}

pub(crate) fn build_table<T: 'static>(
    specs: &[FieldSpec<T>],
) -> Result<FieldTable, FieldError> {
    let mut order = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let opts = match parse_field_options(spec.name, spec.tag) {
            Ok(Some(opts)) => opts,
            Ok(None) => continue,
            Err(message) => return Err(FieldError { message }),
        };
        order.push(FieldEntry {
            spec: i,
            id: opts.id,
            required: opts.required,
        });
    }
    order.sort_by_key(|e| e.id);
    let by_id = order
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i))
        .collect();
    Ok(FieldTable { order, by_id })
}

/// Parses one field tag. `Ok(None)` means the field is ignored.
pub(crate) fn parse_field_options(
    field: &str,
    tag: &str,
) -> Result<Option<FieldOptions>, String> {
    if tag == "-" {
        return Ok(None);
    }

    let (id_part, mut rest) = match tag.find(',') {
        Some(i) => (&tag[..i], &tag[i..]),
        None => (tag, ""),
    };
    let id: i16 = id_part.parse().map_err(|e| {
        format!("field {field} has malformed tag {tag:?}: invalid field id: {e}")
    })?;

    let mut out = FieldOptions { id, required: false };
    let mut seen: HashSet<&str> = HashSet::new();
    while !rest.is_empty() {
        rest = &rest[1..]; // consume comma delimiter
        if rest.is_empty() {
            return Err(format!(
                "field {field} has malformed tag {tag:?}: trailing ',' character"
            ));
        }
        let end = rest.find(',').unwrap_or(rest.len());
        let opt = &rest[..end];
        rest = &rest[end..];

        if !is_identifier(opt) {
            return Err(format!(
                "field {field} has malformed tag {tag:?}: invalid option {opt:?}"
            ));
        }

        match opt {
            "required" => out.required = true,
            _ => {
                // Reject spellings that resemble a known option; this
                // catches mutants such as "Required" or "requi_red".
                let normalized: String = opt
                    .chars()
                    .filter(|c| *c != '_')
                    .flat_map(char::to_lowercase)
                    .collect();
                if normalized == "required" {
                    return Err(format!(
                        "field {field} has invalid appearance of `{opt}` option; specify `{normalized}` instead"
                    ));
                }
                // Anything else is ignored, not reserved.
            }
        }

        if !seen.insert(opt) {
            return Err(format!(
                "field {field} has duplicate appearance of `{opt}` option"
            ));
        }
    }
    Ok(Some(out))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
