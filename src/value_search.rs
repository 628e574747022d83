//! Schema-agnostic key search over JSON documents
//!
//! Price List documents nest the USD figure under versioned, provider-chosen
//! keys (term type, offer term code, price dimension code, `pricePerUnit`).
//! Instead of hard-coding that path, callers search for the leaf key.
//!
//! The search cannot tell two occurrences of the same key apart by position,
//! so callers must decide what zero or several matches mean for them.

use serde_json::Value;

/// Collect every value stored under `key` anywhere in `tree`.
///
/// Traversal is depth-first and pre-order: within an object, a matching
/// entry's value is yielded before the search descends into it. Array
/// elements are walked in order. Repeated keys yield repeated matches.
pub fn find_values<'a>(tree: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect(tree, key, &mut found);
    found
}

/// First match in traversal order, if any.
pub fn find_first<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    find_values(tree, key).into_iter().next()
}

fn collect<'a>(node: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            for (name, child) in map {
                if name == key {
                    found.push(child);
                }
                collect(child, key, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, key, found);
            }
        }
        _ => {}
    }
}
