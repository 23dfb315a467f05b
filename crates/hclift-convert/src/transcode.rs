//! Value-to-body transcoder
//!
//! JSON cannot tell a plain string map (`tags = {...}`) from a nested record
//! (`source_ami_filter {...}`), nor a scalar list from repeated blocks. The
//! transcoder guesses from the most complex member of each collection:
//!
//! - a mapping with any non-scalar member becomes a nested block, otherwise
//!   it is a map attribute
//! - a sequence whose most complex element is a mapping becomes one block per
//!   element, otherwise it is a list attribute
//! - empty sequences are dropped
//!
//! A record whose only fields are scalars is therefore emitted as a map
//! attribute. That is a known limitation and kept as-is.

use hclift_core::{Mapping, Value};

use crate::body::{Block, Body};

/// Convert a mapping into an HCL body, visiting keys in lexical order
pub fn transcode(mapping: &Mapping) -> Body {
    let mut body = Body::new();
    transcode_into(&mut body, mapping);
    body
}

/// Append the transcoding of `mapping` to an existing body
pub fn transcode_into(body: &mut Body, mapping: &Mapping) {
    for (key, value) in sorted(mapping) {
        match value {
            Value::Mapping(map) => {
                if most_complex(sorted(map).map(|(_, v)| v)).is_some_and(Value::is_scalar) {
                    body.set_attribute(key.as_str(), value.clone());
                } else {
                    body.push_block(nested(key, map));
                }
            }
            Value::Sequence(items) => {
                if items.is_empty() {
                    continue;
                }
                let records: Option<Vec<&Mapping>> = match most_complex(items.iter()) {
                    Some(Value::Mapping(_)) => items.iter().map(Value::as_mapping).collect(),
                    _ => None,
                };
                match records {
                    Some(records) => {
                        for record in records {
                            body.push_block(nested(key, record));
                        }
                    }
                    // Scalar lists, lists of lists, and lists mixing records with
                    // other shapes stay attributes
                    None => body.set_attribute(key.as_str(), value.clone()),
                }
            }
            scalar => body.set_attribute(key.as_str(), scalar.clone()),
        }
    }
}

fn nested(kind: &str, mapping: &Mapping) -> Block {
    let mut block = Block::new(kind, Vec::new());
    transcode_into(&mut block.body, mapping);
    block
}

fn sorted(mapping: &Mapping) -> impl Iterator<Item = (&String, &Value)> {
    let mut entries: Vec<_> = mapping.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter()
}

/// The last non-scalar member, or the first scalar when there is none
fn most_complex<'a>(values: impl Iterator<Item = &'a Value>) -> Option<&'a Value> {
    let mut winner: Option<&Value> = None;
    for value in values {
        if !value.is_scalar() || winner.is_none() {
            winner = Some(value);
        }
    }
    winner
}
