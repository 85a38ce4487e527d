//! Dotted/indexed path lookup and `{...}` template substitution.
//!
//! Mirrors `deep_get` / `render_template` from the original Python
//! implementation exactly, including its one quirk: a JSON `null` found
//! along the way is indistinguishable from an absent key (`dict.get`
//! conflates the two), so `deep_get` returns `None` for both.

use serde_json::Value;

enum Segment {
    Key(String),
    Index(usize),
}

/// Split `path` on `.` characters that are not nested inside `[...]`.
fn split_dotted(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0usize;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            '.' if depth == 0 => {
                parts.push(&path[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[last..]);
    parts
}

/// Tokenize one dot-separated segment into a bare key followed by zero or
/// more bracketed integer indices, e.g. `b[0][1]` -> `Key("b"), Index(0),
/// Index(1)`; a segment that is only `[0]` yields a single `Index(0)`.
fn tokenize_segment(segment: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut key_buf = String::new();
    let mut i = 0usize;
    let bytes = segment.as_bytes();
    while i < bytes.len() {
        let c = segment[i..].chars().next().unwrap();
        if c == '[' {
            if !key_buf.is_empty() {
                out.push(Segment::Key(std::mem::take(&mut key_buf)));
            }
            match segment[i..].find(']') {
                Some(close) => {
                    let idx_str = &segment[i + 1..i + close];
                    if let Ok(idx) = idx_str.parse::<usize>() {
                        out.push(Segment::Index(idx));
                    }
                    i += close + 1;
                }
                None => break,
            }
        } else {
            key_buf.push(c);
            i += c.len_utf8();
        }
    }
    if !key_buf.is_empty() {
        out.push(Segment::Key(key_buf));
    }
    out
}

/// Resolve a dotted/indexed path against `data`. Empty path returns `data`
/// unchanged. Keying into a non-object, indexing into a non-array, an
/// out-of-range index, or a `null` encountered anywhere along the path all
/// yield `None`. Never panics.
pub fn deep_get<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }

    let mut current = data;
    for segment in split_dotted(path) {
        for tok in tokenize_segment(segment) {
            current = match tok {
                Segment::Key(k) => current.as_object().and_then(|o| o.get(&k))?,
                Segment::Index(idx) => current.as_array().and_then(|a| a.get(idx))?,
            };
            if current.is_null() {
                return None;
            }
        }
    }
    Some(current)
}

/// Stringify a resolved value for template substitution. Strings are used
/// verbatim; everything else is rendered as compact JSON.
fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Find non-overlapping `{...}` spans in `s` whose contents contain no
/// nested braces, left to right.
fn find_placeholders(s: &str) -> Vec<(usize, usize, &str)> {
    let mut matches = Vec::new();
    let mut idx = 0usize;
    while let Some(open_rel) = s[idx..].find('{') {
        let open = idx + open_rel;
        match s[open + 1..].find(&['{', '}'][..]) {
            Some(next_rel) => {
                let next = open + 1 + next_rel;
                if s.as_bytes()[next] == b'}' {
                    matches.push((open, next + 1, &s[open + 1..next]));
                    idx = next + 1;
                } else {
                    // Nested '{' — restart the search from there.
                    idx = next;
                }
            }
            None => break,
        }
    }
    matches
}

fn render_string(s: &str, context: &Value) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last = 0usize;
    for (start, end, inner) in find_placeholders(s) {
        out.push_str(&s[last..start]);
        match deep_get(context, inner.trim()) {
            Some(v) => out.push_str(&stringify(v)),
            None => out.push_str(&s[start..end]),
        }
        last = end;
    }
    out.push_str(&s[last..]);
    out
}

/// Recursively substitute `{path}` placeholders in strings found anywhere
/// inside `value`, resolving each against `context` via [`deep_get`].
/// Idempotent on values that contain no unresolved placeholders.
pub fn render_template(value: &Value, context: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(render_string(s, context)),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), render_template(v, context))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_template(v, context)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_get_empty_path_returns_root() {
        let v = json!({"a": 1});
        assert_eq!(deep_get(&v, ""), Some(&v));
    }

    #[test]
    fn deep_get_walks_nested_arrays_and_objects() {
        let v = json!({"a": {"b": [ {"c": 42} ]}});
        assert_eq!(deep_get(&v, "a.b[0].c"), Some(&json!(42)));
    }

    #[test]
    fn deep_get_out_of_range_index_is_absent() {
        let v = json!({"a": [1,2]});
        assert_eq!(deep_get(&v, "a[5]"), None);
    }

    #[test]
    fn deep_get_keying_into_non_object_is_absent() {
        let v = json!({"a": 1});
        assert_eq!(deep_get(&v, "a.b"), None);
    }

    #[test]
    fn deep_get_never_panics_on_garbage_path() {
        let v = json!({"a": 1});
        assert_eq!(deep_get(&v, "[[[.....]]]"), None);
    }

    #[test]
    fn render_template_resolves_present_and_preserves_missing() {
        let ctx = json!({"input": {"name": "Ada"}});
        let tpl = json!("hello {missing.path} {input.name}");
        assert_eq!(render_template(&tpl, &ctx), json!("hello {missing.path} Ada"));
    }

    #[test]
    fn render_template_is_idempotent_once_resolved() {
        let ctx = json!({"input": {"name": "Ada"}});
        let once = render_template(&json!("hi {input.name}"), &ctx);
        let twice = render_template(&once, &ctx);
        assert_eq!(once, twice);
    }

    #[test]
    fn render_template_recurses_into_containers() {
        let ctx = json!({"input": {"v": "hi"}});
        let tpl = json!({"a": "{input.v}", "b": ["{input.v}", 3]});
        assert_eq!(tpl_rendered(&tpl, &ctx), json!({"a": "hi", "b": ["hi", 3]}));
    }

    fn tpl_rendered(tpl: &Value, ctx: &Value) -> Value {
        render_template(tpl, ctx)
    }
}
