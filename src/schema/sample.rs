//! Sample data generation for contract tests.
//!
//! Required fields are always populated; optional fields appear with
//! probability 0.5. Generated values respect the schema's type, enum,
//! length, range and item-count constraints, so a sample always validates
//! against the schema it came from.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};

use super::definition::{SchemaDef, SchemaNode, ValueKind};

/// Probability of emitting an optional property.
const OPTIONAL_PROBABILITY: f64 = 0.5;

/// Nesting depth after which objects are left empty.
const MAX_DEPTH: usize = 8;

/// Generate a sample value for `schema` with the thread-local RNG.
pub fn generate_sample(schema: &SchemaDef) -> Value {
    generate_sample_with_rng(schema, &mut rand::thread_rng())
}

/// Generate a sample value for `schema` with a caller-supplied RNG.
pub fn generate_sample_with_rng<R: Rng + ?Sized>(schema: &SchemaDef, rng: &mut R) -> Value {
    sample_node(&schema.root, "", rng, 0)
}

fn sample_node<R: Rng + ?Sized>(
    node: &SchemaNode,
    field: &str,
    rng: &mut R,
    depth: usize,
) -> Value {
    if let Some(allowed) = &node.allowed {
        if let Some(choice) = allowed.choose(rng) {
            return choice.clone();
        }
    }

    match node.effective_kind().unwrap_or(ValueKind::String) {
        ValueKind::String => Value::String(sample_string(node, field)),
        ValueKind::Number => json!(sample_number(node, field, rng)),
        ValueKind::Integer => json!(sample_integer(node, rng)),
        ValueKind::Boolean => Value::Bool(rng.gen_bool(0.5)),
        ValueKind::Null => Value::Null,
        ValueKind::Array => {
            let min = node.min_items.unwrap_or(1);
            let max = node.max_items.unwrap_or(min.max(3)).max(min);
            let count = rng.gen_range(min..=max.min(min + 3));
            let untyped = SchemaNode::default();
            let item = node.items.as_deref().unwrap_or(&untyped);
            let item_field = field.trim_end_matches('s');
            Value::Array(
                (0..count)
                    .map(|_| sample_node(item, item_field, rng, depth + 1))
                    .collect(),
            )
        }
        ValueKind::Object => {
            let mut map = Map::new();
            if depth >= MAX_DEPTH {
                return Value::Object(map);
            }
            for (name, child) in &node.properties {
                if node.is_required(name) || rng.gen_bool(OPTIONAL_PROBABILITY) {
                    map.insert(name.clone(), sample_node(child, name, rng, depth + 1));
                }
            }
            // Required names without a declared schema still get a value.
            for name in &node.required {
                if !map.contains_key(name) {
                    map.insert(name.clone(), Value::String(format!("sample {}", name)));
                }
            }
            Value::Object(map)
        }
    }
}

fn sample_string(node: &SchemaNode, field: &str) -> String {
    let mut text = if field.contains("anchor") {
        "section_1_sample".to_string()
    } else if field.is_empty() {
        "sample".to_string()
    } else {
        format!("sample {}", field.replace('_', " "))
    };

    if let Some(min) = node.min_length {
        let length = text.chars().count();
        if length < min {
            text.push_str(&"x".repeat(min - length));
        }
    }
    if let Some(max) = node.max_length {
        text = text.chars().take(max).collect();
    }
    text
}

fn sample_number<R: Rng + ?Sized>(node: &SchemaNode, field: &str, rng: &mut R) -> f64 {
    let (default_min, default_max): (f64, f64) =
        if field.contains("score") || field.contains("confidence") {
            (0.0, 1.0)
        } else {
            (0.0, 100.0)
        };
    let min = node.minimum.unwrap_or(default_min);
    let max = node.maximum.unwrap_or(default_max.max(min));
    if max <= min {
        return min;
    }
    // Two decimals keep samples readable.
    let value = rng.gen_range(min..=max);
    ((value * 100.0).round() / 100.0).clamp(min, max)
}

fn sample_integer<R: Rng + ?Sized>(node: &SchemaNode, rng: &mut R) -> i64 {
    let min = node.minimum.map(|m| m.ceil() as i64).unwrap_or(0);
    let max = node
        .maximum
        .map(|m| m.floor() as i64)
        .unwrap_or(min.saturating_add(100))
        .max(min);
    rng.gen_range(min..=max)
}
