//! Server renderer – runs a template's view program once per request and
//! serialises the result.
//!
//! Rendering is pure: the output depends only on the descriptor, the
//! (already inlined) content and the derived metadata.

use crate::content::ContentTree;
use crate::error::RenderError;
use crate::markup::{
    check_tree, first_difference, parse_fragment, to_html, MarkupNode, MOUNT_TAG,
};
use crate::metadata::DerivedMetadata;
use crate::templates::TemplateDescriptor;
use crate::view::render_view;

/// Build the markup tree for `descriptor` without serialising it.
pub fn render_tree(
    descriptor: &TemplateDescriptor,
    content: &ContentTree,
    meta: &DerivedMetadata,
) -> Result<Vec<MarkupNode>, RenderError> {
    render_view(&descriptor.view, content, meta)
}

/// Render to an HTML fragment and check it reads back as the same tree.
pub fn render(
    descriptor: &TemplateDescriptor,
    content: &ContentTree,
    meta: &DerivedMetadata,
) -> Result<String, RenderError> {
    render_with(descriptor, content, meta, true)
}

/// Render to an HTML fragment, optionally skipping the read-back check.
pub fn render_with(
    descriptor: &TemplateDescriptor,
    content: &ContentTree,
    meta: &DerivedMetadata,
    verify: bool,
) -> Result<String, RenderError> {
    let tree = render_tree(descriptor, content, meta)?;
    let html = to_html(&tree);
    if verify {
        verify_markup(&tree, &html)?;
    }
    log::debug!(
        "rendered template '{}' ({} bytes)",
        descriptor.identifier,
        html.len()
    );
    Ok(html)
}

/// Parse `html` and require it to equal `tree` node for node, with every
/// element where a browser would leave it.
pub fn verify_markup(tree: &[MarkupNode], html: &str) -> Result<(), RenderError> {
    let parsed = parse_fragment(html).map_err(RenderError::MarkupMismatch)?;
    check_tree(&parsed, &[MOUNT_TAG])?;
    match first_difference(tree, &parsed) {
        Some(diff) => Err(RenderError::MarkupMismatch(diff)),
        None => Ok(()),
    }
}
