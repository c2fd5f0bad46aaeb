//! View programs – the declarative form every template's renderer takes.
//!
//! A template is a tree of [`ViewNode`]s. The server interprets it here to
//! build a [`MarkupNode`] tree; the client runtime receives the same program as
//! JSON and interprets it with identical rules to rebuild that tree in the
//! browser. Keeping the renderer as data rather than code is what makes the
//! two sides agree.
//!
//! Bindings are dotted paths whose first segment names a scope root:
//! `content.*`, `meta.*`, `loop.index` / `loop.number`, or the alias of an
//! enclosing `each`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{is_truthy, lookup, safe_url, to_text};
use crate::error::RenderError;
use crate::markup::{check_nesting, push_normalized, Element, MarkupNode, MOUNT_TAG};
use crate::metadata::DerivedMetadata;

/// Deepest element nesting a view may produce.
pub const MAX_DEPTH: usize = 64;

/// One piece of a text node or attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Lit(String),
    Bind(String),
}

/// A node in a view program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewNode {
    El {
        tag: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attrs: Vec<(String, Vec<Segment>)>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<ViewNode>,
    },
    Text(Vec<Segment>),
    /// Repeat `body` for every item of the array at `path`, binding the item
    /// to `alias`. Anything other than an array renders nothing.
    Each {
        path: String,
        alias: String,
        body: Vec<ViewNode>,
    },
    /// Render `body` only when the value at `path` is truthy.
    When { path: String, body: Vec<ViewNode> },
    /// Render `body` only when the value at `path` is falsy.
    Unless { path: String, body: Vec<ViewNode> },
}

// ---------------------------------------------------------------------------
// Builders used by the template modules
// ---------------------------------------------------------------------------

/// Start an element.
pub fn el(tag: &str) -> ElBuilder {
    ElBuilder {
        tag: tag.to_string(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

/// Literal text.
pub fn text(s: &str) -> ViewNode {
    ViewNode::Text(vec![Segment::Lit(s.to_string())])
}

/// Text bound to a path.
pub fn bind(path: &str) -> ViewNode {
    ViewNode::Text(vec![Segment::Bind(path.to_string())])
}

/// Text mixing literals and bindings: `interp("Dear {content.guest},")`.
pub fn interp(template: &str) -> ViewNode {
    ViewNode::Text(parse_segments(template))
}

pub fn each(path: &str, alias: &str, body: Vec<ViewNode>) -> ViewNode {
    ViewNode::Each {
        path: path.to_string(),
        alias: alias.to_string(),
        body,
    }
}

pub fn when(path: &str, body: Vec<ViewNode>) -> ViewNode {
    ViewNode::When {
        path: path.to_string(),
        body,
    }
}

pub fn unless(path: &str, body: Vec<ViewNode>) -> ViewNode {
    ViewNode::Unless {
        path: path.to_string(),
        body,
    }
}

/// Split `"a {x.y} b"` into literal and binding segments. `{{` escapes a brace.
pub fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut lit = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                lit.push('{');
            }
            '{' => {
                let path: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if !lit.is_empty() {
                    segments.push(Segment::Lit(std::mem::take(&mut lit)));
                }
                segments.push(Segment::Bind(path.trim().to_string()));
            }
            _ => lit.push(c),
        }
    }
    if !lit.is_empty() {
        segments.push(Segment::Lit(lit));
    }
    segments
}

pub struct ElBuilder {
    tag: String,
    attrs: Vec<(String, Vec<Segment>)>,
    children: Vec<ViewNode>,
}

impl ElBuilder {
    /// Attribute with `{path}` interpolation.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), parse_segments(value)));
        self
    }

    pub fn class(self, value: &str) -> Self {
        self.attr("class", value)
    }

    pub fn id(self, value: &str) -> Self {
        self.attr("id", value)
    }

    pub fn child(mut self, node: impl Into<ViewNode>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(self, s: &str) -> Self {
        self.child(text(s))
    }

    pub fn bind(self, path: &str) -> Self {
        self.child(bind(path))
    }

    pub fn build(self) -> ViewNode {
        ViewNode::El {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

impl From<ElBuilder> for ViewNode {
    fn from(b: ElBuilder) -> Self {
        b.build()
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Frame<'a> {
    alias: &'a str,
    item: &'a Value,
    index: usize,
}

struct Scope<'a> {
    content: &'a Value,
    meta: &'a Value,
    frames: Vec<Frame<'a>>,
}

impl<'a> Scope<'a> {
    fn resolve(&self, path: &str) -> Result<Value, RenderError> {
        let mut parts = path.split('.');
        let root = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        let base = match root {
            "content" => self.content,
            "meta" => self.meta,
            "loop" => {
                let Some(frame) = self.frames.last() else {
                    return Err(RenderError::UnknownBinding(path.to_string()));
                };
                return Ok(match rest.as_slice() {
                    ["index"] => Value::from(frame.index),
                    ["number"] => Value::from(frame.index + 1),
                    _ => Value::Null,
                });
            }
            alias => match self.frames.iter().rev().find(|f| f.alias == alias) {
                Some(frame) => frame.item,
                None => return Err(RenderError::UnknownBinding(path.to_string())),
            },
        };
        Ok(lookup(base, &rest).cloned().unwrap_or(Value::Null))
    }

    fn segments_to_string(&self, segments: &[Segment]) -> Result<String, RenderError> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Lit(s) => out.push_str(s),
                Segment::Bind(path) => out.push_str(&to_text(&self.resolve(path)?)),
            }
        }
        Ok(out)
    }
}

/// Interpret `program` against `content` and `meta`.
///
/// Pure: the same inputs always give the same tree.
pub fn render_view(
    program: &[ViewNode],
    content: &Value,
    meta: &DerivedMetadata,
) -> Result<Vec<MarkupNode>, RenderError> {
    // Bindings see exactly what the client sees after JSON round-tripping.
    let meta = bindable(meta)?;
    let mut scope = Scope {
        content,
        meta: &meta,
        frames: Vec::new(),
    };
    let mut out = Vec::new();
    render_nodes(program, &mut scope, &[MOUNT_TAG], 0, &mut out)?;
    Ok(out)
}

/// Metadata as the JSON value bindings resolve against.
fn bindable<T: Serialize>(meta: &T) -> Result<Value, RenderError> {
    serde_json::to_value(meta).map_err(|e| RenderError::Metadata(e.to_string()))
}

fn render_nodes<'a>(
    nodes: &'a [ViewNode],
    scope: &mut Scope<'a>,
    ancestors: &[&str],
    depth: usize,
    out: &mut Vec<MarkupNode>,
) -> Result<(), RenderError> {
    if depth > MAX_DEPTH {
        return Err(RenderError::TooDeep(MAX_DEPTH));
    }
    for node in nodes {
        match node {
            ViewNode::Text(segments) => {
                let text = scope.segments_to_string(segments)?;
                if !text.is_empty() {
                    check_nesting(ancestors, "#text")?;
                }
                push_normalized(out, MarkupNode::Text(text));
            }
            ViewNode::El {
                tag,
                attrs,
                children,
            } => {
                check_nesting(ancestors, tag)?;
                let mut el = Element::new(tag.clone());
                for (name, segments) in attrs {
                    let mut value = scope.segments_to_string(segments)?;
                    if matches!(name.as_str(), "href" | "src" | "action") {
                        value = safe_url(value);
                    }
                    el.attrs.push((name.clone(), value));
                }
                let mut open = ancestors.to_vec();
                open.push(tag);
                render_nodes(children, scope, &open, depth + 1, &mut el.children)?;
                out.push(MarkupNode::Element(el));
            }
            ViewNode::Each { path, alias, body } => {
                let items = match scope.resolve(path)? {
                    Value::Array(items) => items,
                    _ => continue,
                };
                // Loop items are owned by this call, so they are rendered
                // through a scope that borrows them.
                for (index, item) in items.iter().enumerate() {
                    let mut inner = Scope {
                        content: scope.content,
                        meta: scope.meta,
                        frames: scope.frames.clone(),
                    };
                    inner.frames.push(Frame {
                        alias: alias.as_str(),
                        item,
                        index,
                    });
                    render_nodes(body, &mut inner, ancestors, depth + 1, out)?;
                }
            }
            ViewNode::When { path, body } => {
                if is_truthy(&scope.resolve(path)?) {
                    render_nodes(body, scope, ancestors, depth + 1, out)?;
                }
            }
            ViewNode::Unless { path, body } => {
                if !is_truthy(&scope.resolve(path)?) {
                    render_nodes(body, scope, ancestors, depth + 1, out)?;
                }
            }
        }
    }
    Ok(())
}
