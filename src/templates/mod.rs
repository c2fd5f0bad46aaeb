//! Template registry – the static lookup table from template identifier to
//! renderer.
//!
//! Each template module contributes one [`TemplateDescriptor`]. The registry is
//! built once, on first use, and is read-only afterwards.

use std::collections::HashMap;
use std::sync::{LazyLock, OnceLock};

use serde::Serialize;
use serde_json::Value;

use crate::content::ContentTree;
use crate::error::CompileError;
use crate::metadata::{derive, DerivedMetadata, TitleFn};
use crate::view::ViewNode;

pub mod aurora;
pub mod celebration;
pub mod sakinah;

/// One registered template.
pub struct TemplateDescriptor {
    /// Lowercase lookup key.
    pub identifier: &'static str,
    pub name: &'static str,
    /// The renderer, as a view program interpreted on both server and client.
    pub view: Vec<ViewNode>,
    pub title: TitleFn,
    /// Template CSS, inlined into the document head.
    pub stylesheet: &'static str,
    pub default_content: Value,
    /// Minified client entry, built on first synthesis.
    pub(crate) client_entry: OnceLock<String>,
}

impl TemplateDescriptor {
    pub fn new(
        identifier: &'static str,
        name: &'static str,
        view: Vec<ViewNode>,
        title: TitleFn,
        stylesheet: &'static str,
        default_content: Value,
    ) -> Self {
        Self {
            identifier,
            name,
            view,
            title,
            stylesheet,
            default_content,
            client_entry: OnceLock::new(),
        }
    }

    /// Project content into the metadata this template renders with.
    pub fn derive_metadata(&self, content: &ContentTree) -> DerivedMetadata {
        derive(content, self.title)
    }
}

impl std::fmt::Debug for TemplateDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDescriptor")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Listing entry served to the builder UI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary<'a> {
    pub identifier: &'a str,
    pub name: &'a str,
    pub default_content: &'a Value,
}

struct Registry {
    templates: Vec<TemplateDescriptor>,
    index: HashMap<&'static str, usize>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let templates = vec![
        sakinah::descriptor(),
        aurora::descriptor(),
        celebration::descriptor(),
    ];
    let index = templates
        .iter()
        .enumerate()
        .map(|(i, t)| (t.identifier, i))
        .collect();
    Registry { templates, index }
});

/// Look up a template by identifier, ignoring case and surrounding whitespace.
pub fn resolve(identifier: &str) -> Result<&'static TemplateDescriptor, CompileError> {
    let key = identifier.trim().to_ascii_lowercase();
    REGISTRY
        .index
        .get(key.as_str())
        .map(|&i| &REGISTRY.templates[i])
        .ok_or_else(|| CompileError::TemplateNotFound(identifier.to_string()))
}

/// All templates in registration order.
pub fn list() -> &'static [TemplateDescriptor] {
    &REGISTRY.templates
}

/// Summaries for the template picker.
pub fn summaries() -> Vec<TemplateSummary<'static>> {
    list()
        .iter()
        .map(|t| TemplateSummary {
            identifier: t.identifier,
            name: t.name,
            default_content: &t.default_content,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(resolve("SAKINAH").unwrap().identifier, "sakinah");
        assert_eq!(resolve("  Aurora ").unwrap().identifier, "aurora");
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = resolve("does-not-exist").unwrap_err();
        assert!(matches!(err, CompileError::TemplateNotFound(ref id) if id == "does-not-exist"));
        assert!(err.is_client_error());
    }

    #[test]
    fn identifiers_are_unique_and_lowercase() {
        let mut seen = std::collections::HashSet::new();
        for t in list() {
            assert_eq!(t.identifier, t.identifier.to_ascii_lowercase());
            assert!(seen.insert(t.identifier), "duplicate {}", t.identifier);
        }
    }

    #[test]
    fn every_template_renders_its_default_content() {
        for t in list() {
            let meta = t.derive_metadata(&t.default_content);
            let html = render(t, &t.default_content, &meta)
                .unwrap_or_else(|e| panic!("template '{}' failed: {e}", t.identifier));
            assert!(!html.is_empty(), "template '{}' rendered nothing", t.identifier);
        }
    }

    #[test]
    fn every_template_renders_empty_content() {
        for t in list() {
            let empty = serde_json::json!({});
            let meta = t.derive_metadata(&empty);
            assert!(
                render(t, &empty, &meta).is_ok(),
                "template '{}' failed on empty content",
                t.identifier
            );
        }
    }
}
