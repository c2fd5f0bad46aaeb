//! Client bundle synthesizer – the hydration script shipped inside every
//! artifact, and the JSON payload it reads.
//!
//! A template's entry script is the generic runtime plus that template's view
//! program, wrapped in an IIFE and minified. It does not depend on the
//! content, so it is built once per process and cached on the descriptor.
//! Per-request data travels separately in the payload element.

use serde::{Deserialize, Serialize};

use crate::content::ContentTree;
use crate::error::SynthesisError;
use crate::jsminify::minify_js;
use crate::metadata::DerivedMetadata;
use crate::templates::{self, TemplateDescriptor};

/// `id` of the element the server markup is mounted in.
pub const ROOT_ID: &str = "invitation-root";
/// `id` of the `<script type="application/json">` carrying the payload.
pub const DATA_ID: &str = "invitation-data";

/// Runtime shared by every template. Defines `hydrate(program, rootId, dataId)`.
pub const HYDRATE_RUNTIME_JS: &str = include_str!("hydrate-runtime.js");

/// Everything the client needs to rebuild the server tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    pub template: String,
    pub meta: DerivedMetadata,
    pub content: ContentTree,
}

impl DataPayload {
    pub fn new(template: &str, meta: &DerivedMetadata, content: &ContentTree) -> Self {
        Self {
            template: template.to_string(),
            meta: meta.clone(),
            content: content.clone(),
        }
    }

    /// Serialise for embedding in a `<script>` element.
    pub fn to_script_json(&self) -> Result<String, SynthesisError> {
        let json = serde_json::to_string(self).map_err(|source| SynthesisError::Serialize {
            what: "data payload",
            source,
        })?;
        Ok(escape_script_json(&json))
    }
}

/// Escape JSON so it cannot terminate or confuse an enclosing `<script>`.
///
/// The replaced characters only ever occur inside JSON string literals, where
/// `\uXXXX` is an equivalent spelling.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Return the template's entry script, building and caching it on first use.
pub fn client_entry(descriptor: &TemplateDescriptor) -> Result<&str, SynthesisError> {
    if let Some(entry) = descriptor.client_entry.get() {
        return Ok(entry);
    }
    let built = build_entry(descriptor)?;
    Ok(descriptor.client_entry.get_or_init(|| built))
}

fn build_entry(descriptor: &TemplateDescriptor) -> Result<String, SynthesisError> {
    let program =
        serde_json::to_string(&descriptor.view).map_err(|source| SynthesisError::Serialize {
            what: "view program",
            source,
        })?;
    let source = format!(
        concat!(
            "(function () {{\n'use strict';\n{runtime}\n",
            "hydrate({program}, \"{root}\", \"{data}\");\n}})();\n",
        ),
        runtime = HYDRATE_RUNTIME_JS,
        program = escape_script_json(&program),
        root = ROOT_ID,
        data = DATA_ID,
    );
    let entry = minify_js(&source)?;
    if !is_embeddable(&entry) {
        return Err(SynthesisError::UnsafeScript(descriptor.identifier.to_string()));
    }
    log::info!(
        "Built client entry for '{}' ({} bytes, {} before minification)",
        descriptor.identifier,
        entry.len(),
        source.len()
    );
    Ok(entry)
}

/// A script body must not contain anything the HTML tokenizer acts on.
fn is_embeddable(script: &str) -> bool {
    let lower = script.to_ascii_lowercase();
    !lower.contains("</script") && !lower.contains("<!--")
}

/// Produce the hydration script for one request.
///
/// The script itself is the cached per-template entry; the request's content
/// and metadata reach it through the payload. They are checked here so a
/// value that cannot be serialised fails synthesis rather than assembly.
pub fn synthesize(
    descriptor: &TemplateDescriptor,
    content: &ContentTree,
    meta: &DerivedMetadata,
) -> Result<String, SynthesisError> {
    serde_json::to_writer(std::io::sink(), meta).map_err(|source| SynthesisError::Serialize {
        what: "metadata",
        source,
    })?;
    serde_json::to_writer(std::io::sink(), content).map_err(|source| {
        SynthesisError::Serialize {
            what: "content",
            source,
        }
    })?;
    Ok(client_entry(descriptor)?.to_string())
}

/// Build every registered template's entry up front.
pub fn precompile_all() -> Result<usize, SynthesisError> {
    let all = templates::list();
    for descriptor in all {
        client_entry(descriptor)?;
    }
    Ok(all.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::resolve;
    use serde_json::json;

    #[test]
    fn payload_escapes_script_terminators() {
        let t = resolve("aurora").unwrap();
        let content = json!({ "message": "</script><script>alert(1)</script> & \u{2028}" });
        let meta = t.derive_metadata(&content);
        let json = DataPayload::new(t.identifier, &meta, &content)
            .to_script_json()
            .unwrap();
        assert!(!json.contains('<'));
        assert!(!json.contains('>'));
        assert!(!json.contains('\u{2028}'));
        let back: DataPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, content);
    }

    #[test]
    fn entry_is_cached_per_descriptor() {
        let t = resolve("sakinah").unwrap();
        let a = client_entry(t).unwrap();
        let b = client_entry(t).unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn entry_references_root_and_payload_ids() {
        let t = resolve("celebration").unwrap();
        let entry = client_entry(t).unwrap();
        assert!(entry.starts_with("(function(){"));
        assert!(entry.ends_with("})();"));
        assert!(entry.contains(&format!("\"{ROOT_ID}\",\"{DATA_ID}\"")));
        assert!(is_embeddable(entry));
    }

    #[test]
    fn runtime_keeps_every_behavior() {
        for name in ["toggle", "carousel", "audio", "countdown", "copy", "rsvp"] {
            assert!(HYDRATE_RUNTIME_JS.contains(&format!("{name}: bind")), "{name}");
        }
    }

    #[test]
    fn synthesize_returns_cached_entry() {
        let t = resolve("sakinah").unwrap();
        let meta = t.derive_metadata(&t.default_content);
        let script = synthesize(t, &t.default_content, &meta).unwrap();
        assert_eq!(script, client_entry(t).unwrap());
    }

    #[test]
    fn precompiles_every_template() {
        assert_eq!(precompile_all().unwrap(), templates::list().len());
    }

    #[test]
    fn closing_tags_are_not_embeddable() {
        assert!(!is_embeddable("var a = '</SCRIPT>';"));
        assert!(!is_embeddable("var a = '<!--';"));
        assert!(is_embeddable("var a = 1 < 2;"));
    }
}
