//! Vector math and JSON helpers shared by the store adapters.

use serde_json::Value;

use crate::document::Metadata;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Equivalent to
/// pgvector's `1 - (a <=> b)`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Format an embedding as a pgvector literal, e.g. `[0.1,0.2,0.3]`.
pub fn format_embedding(embedding: &[f32]) -> String {
    format!("[{}]", embedding.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
}

/// Parse an embedding returned by a store as text.
///
/// Accepts the pgvector form (`[0.1,0.2]`), the Postgres array form
/// (`{0.1,0.2}`) and a bare comma-separated list. Returns `None` if any
/// component is not a number.
pub fn parse_embedding(raw: &str) -> Option<Vec<f32>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() {
        return Some(Vec::new());
    }

    inner.split(',').map(|part| part.trim().parse::<f32>().ok()).collect()
}

/// Return `true` if `metadata` contains every key/value pair of `filter`.
///
/// Follows Postgres `jsonb @>` semantics: an empty filter matches
/// everything, objects are compared recursively, an array contains another
/// array when every element of the latter is contained in some element of the
/// former, and scalars compare by equality.
pub fn metadata_matches(metadata: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(key, expected)| {
        metadata.get(key).is_some_and(|actual| json_contains(actual, expected))
    })
}

/// JSON containment: does `haystack` contain `needle`?
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => {
            n.iter().all(|(k, v)| h.get(k).is_some_and(|hv| json_contains(hv, v)))
        }
        (Value::Array(h), Value::Array(n)) => {
            n.iter().all(|nv| h.iter().any(|hv| json_contains(hv, nv)))
        }
        // A top-level array contains a matching scalar element.
        (Value::Array(h), scalar) if !scalar.is_object() => h.iter().any(|hv| hv == scalar),
        (Value::Number(h), Value::Number(n)) => h.as_f64() == n.as_f64(),
        (h, n) => h == n,
    }
}
