//! Tag list normalization.

use serde_json::Value;

/// Trims every tag, drops empty ones, and removes duplicates keeping the
/// first occurrence.
pub fn normalize<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Normalizes tags given as JSON: a single string, an array of strings, or
/// arbitrarily nested arrays. `null` entries are dropped, as are any other
/// non-string values.
pub fn from_json(value: &Value) -> Vec<String> {
    let mut flat = Vec::new();
    flatten(value, &mut flat);
    normalize(flat)
}

fn flatten<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| flatten(v, out)),
        _ => {}
    }
}
