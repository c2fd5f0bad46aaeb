//! Content tree helpers shared by the inliner, the metadata projection and the
//! view interpreter.
//!
//! The value rules here (`to_text`, `is_truthy`, `safe_url`) are mirrored
//! one-for-one by the client runtime in `hydrate-runtime.js`. Changing one side
//! without the other breaks hydration parity.

use serde_json::Value;

/// The nested, form-editable data describing one invitation.
///
/// `serde_json` is built with `preserve_order`, so object keys keep their
/// insertion order through parsing, inlining and re-serialisation.
pub type ContentTree = Value;

/// Raster formats the inliner recognises, by file extension.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Whether a string leaf is a local image reference that should be inlined.
///
/// Rejects anything carrying a scheme (`https:`, `data:`), protocol-relative
/// URLs, and values with whitespace or control characters; those are prose or
/// remote URLs, not asset paths.
pub fn is_asset_reference(s: &str) -> bool {
    if s.is_empty() || s.len() > 1024 {
        return false;
    }
    if s.starts_with("//") || s.contains(':') {
        return false;
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((stem, ext)) = s.rsplit_once('.') else {
        return false;
    };
    if stem.is_empty() || stem.ends_with('/') {
        return false;
    }
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
}

/// Strip the `/` or `./` prefixes an editor may put in front of an asset path.
pub fn normalize_asset_path(s: &str) -> &str {
    let mut path = s;
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}

/// Follow a dotted path (`couple.bride`, `gallery.0`) from `root`.
///
/// Numeric segments index into arrays. Missing keys resolve to `None`.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Convenience for a `&str` leaf at a dotted path.
pub fn lookup_str<'a>(root: &'a Value, dotted: &str) -> Option<&'a str> {
    let segments: Vec<&str> = dotted.split('.').collect();
    lookup(root, &segments)?.as_str()
}

/// Text a value renders as.
///
/// Numbers go through their `f64` value and ECMAScript `Number::toString`,
/// so the browser's `String(n)` prints exactly the same digits, including the
/// precision lost above 2^53 and the exponent forms below 1e-6 and from 1e21.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => parser_text(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => ryu_js::Buffer::new().format_finite(f).to_string(),
            _ => String::new(),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Text as an HTML parser will hand it back: CR/CRLF become LF and NUL is
/// dropped.
fn parser_text(s: &str) -> String {
    if !s.contains(['\r', '\0']) {
        return s.to_string();
    }
    s.replace("\r\n", "\n").replace('\r', "\n").replace('\0', "")
}

/// Truthiness used by `when` blocks: null, false, "", 0 and [] are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Neutralise script-bearing URL schemes in `href`/`src`/`action` values.
pub fn safe_url(value: String) -> String {
    let probe: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect::<String>()
        .to_ascii_lowercase();
    if probe.starts_with("javascript:") || probe.starts_with("vbscript:") {
        "#".to_string()
    } else {
        value
    }
}
