//! Markup tree – the rendered output of a view, its HTML serialisation, and a
//! parser for reading that serialisation back.
//!
//! The tree is kept in the shape an HTML parser would build from its own
//! serialisation: no empty text nodes, no adjacent text nodes, and no nesting
//! the parser would repair. That is what lets the client runtime compare its
//! reconstruction against the live DOM node-by-node.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// A node in a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

/// An element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child, merging text with a preceding text node and dropping
    /// empty text.
    pub fn push(&mut self, child: MarkupNode) {
        push_normalized(&mut self.children, child);
    }
}

/// Append to a sibling list under the normalisation rules.
pub fn push_normalized(siblings: &mut Vec<MarkupNode>, node: MarkupNode) {
    match node {
        MarkupNode::Text(text) if text.is_empty() => {}
        MarkupNode::Text(text) => match siblings.last_mut() {
            Some(MarkupNode::Text(prev)) => prev.push_str(&text),
            _ => siblings.push(MarkupNode::Text(text)),
        },
        element => siblings.push(element),
    }
}

/// Elements serialised without a closing tag.
pub fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

/// Tag the rendered fragment is mounted in.
pub const MOUNT_TAG: &str = "div";

/// Start tags that close an open `<p>` in button scope.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p", "pre",
    "search", "section", "summary", "table", "ul", "xmp",
];

/// Elements that bound the button scope a `<p>` is looked up in.
const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// The parser's "special" elements, minus `address`, `div` and `p`. An open
/// list item is only looked for below the nearest of these.
const LIST_ITEM_SCOPE: &[&str] = &[
    "applet", "area", "article", "aside", "base", "blockquote", "body", "br", "button", "caption",
    "center", "col", "colgroup", "dd", "details", "dir", "dl", "dt", "embed", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header",
    "hgroup", "hr", "html", "iframe", "img", "input", "li", "link", "listing", "main", "marquee",
    "menu", "meta", "nav", "object", "ol", "pre", "script", "search", "section", "select",
    "source", "style", "summary", "table", "tbody", "td", "template", "textarea", "tfoot", "th",
    "thead", "title", "tr", "track", "ul", "wbr",
];

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

const INTERACTIVE: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "details", "audio", "video",
];

/// The open element, if any, that the parser would close (or refuse to nest
/// under) when `child` starts inside `ancestors`.
fn displaced_ancestor<'a>(ancestors: &[&'a str], child: &str) -> Option<&'a str> {
    let open = || ancestors.iter().rev().copied();

    if CLOSES_P.contains(&child) {
        let p = open()
            .take_while(|tag| !BUTTON_SCOPE.contains(tag))
            .find(|&tag| tag == "p");
        if p.is_some() {
            return p;
        }
    }
    match child {
        "a" | "form" | "button" => open().find(|&tag| tag == child),
        "li" => open_list_item(ancestors, &["li"]),
        "dd" | "dt" => open_list_item(ancestors, &["dd", "dt"]),
        _ => None,
    }
}

fn open_list_item<'a>(ancestors: &[&'a str], kinds: &[&str]) -> Option<&'a str> {
    for &tag in ancestors.iter().rev() {
        if kinds.contains(&tag) {
            return Some(tag);
        }
        if LIST_ITEM_SCOPE.contains(&tag) {
            return None;
        }
    }
    None
}

/// Reject a child an HTML parser would not keep where it is written.
///
/// `ancestors` lists the open elements, outermost first. `child` is a tag
/// name, or `#text` for a text node.
pub fn check_nesting(ancestors: &[&str], child: &str) -> Result<(), RenderError> {
    let Some(&parent) = ancestors.last() else {
        return Ok(());
    };
    let invalid = |owner: &str| {
        Err(RenderError::InvalidNesting {
            parent: owner.to_string(),
            child: child.to_string(),
        })
    };

    if is_void(parent) {
        return Err(RenderError::VoidWithChildren(parent.to_string()));
    }
    if matches!(child, "script" | "style" | "template" | "iframe" | "html" | "body" | "head") {
        return invalid(parent);
    }
    let bad = match parent {
        "a" | "button" => INTERACTIVE.contains(&child),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => is_heading(child),
        "select" => !matches!(child, "option" | "optgroup"),
        "table" => child == "tr" || child == "#text",
        "thead" | "tbody" | "tfoot" | "tr" => child == "#text",
        "textarea" | "title" | "option" => child != "#text",
        _ => false,
    };
    if bad {
        return invalid(parent);
    }
    match displaced_ancestor(ancestors, child) {
        Some(owner) => invalid(owner),
        None => Ok(()),
    }
}

/// Run [`check_nesting`] over a whole tree mounted under `ancestors`.
pub fn check_tree(nodes: &[MarkupNode], ancestors: &[&str]) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            MarkupNode::Text(text) if text.is_empty() => {}
            MarkupNode::Text(_) => check_nesting(ancestors, "#text")?,
            MarkupNode::Element(el) => {
                check_nesting(ancestors, &el.tag)?;
                let mut open = ancestors.to_vec();
                open.push(&el.tag);
                check_tree(&el.children, &open)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serialisation
// ---------------------------------------------------------------------------

/// Serialise a sibling list to compact HTML (no inter-tag whitespace).
pub fn to_html(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &MarkupNode) {
    match node {
        MarkupNode::Text(text) => escape_text_into(out, text),
        MarkupNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr_into(out, value);
                out.push('"');
            }
            out.push('>');
            if is_void(&el.tag) {
                return;
            }
            for child in &el.children {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_text_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Escape a string for use as element text.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_text_into(&mut out, text);
    out
}

/// Escape a string for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_attr_into(&mut out, value);
    out
}

// ---------------------------------------------------------------------------
// Parser – strict recursive descent over serialised markup
// ---------------------------------------------------------------------------

/// Parse an HTML fragment into a normalised node list.
///
/// This handles the serialisation produced by [`to_html`] plus ordinary
/// hand-written fragments: quoted and bare attributes, void elements, `/>`,
/// comments (dropped) and the common entities. Mismatched or missing closing
/// tags are errors rather than being repaired.
pub fn parse_fragment(html: &str) -> Result<Vec<MarkupNode>, String> {
    let mut parser = Parser::new(html);
    let nodes = parser.parse_nodes(None)?;
    if !parser.eof() {
        return Err(format!("unexpected closing tag at byte {}", parser.pos));
    }
    Ok(nodes)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self, open_tag: Option<&str>) -> Result<Vec<MarkupNode>, String> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                return match open_tag {
                    Some(tag) => Err(format!("unclosed <{tag}>")),
                    None => Ok(nodes),
                };
            }
            if self.starts_with("</") {
                // The caller checks the closing tag (or rejects a stray one).
                return Ok(nodes);
            }
            if self.starts_with("<!--") {
                self.skip_comment();
                continue;
            }
            if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_past('>');
                continue;
            }
            let node = if self.starts_with("<") {
                self.parse_element()?
            } else {
                self.parse_text()
            };
            push_normalized(&mut nodes, node);
        }
    }

    fn parse_text(&mut self) -> MarkupNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance();
        }
        MarkupNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> Result<MarkupNode, String> {
        self.advance(); // '<'
        let tag = self.parse_name().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(format!("expected tag name at byte {}", self.pos));
        }
        let mut el = Element::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() {
                return Err(format!("unterminated <{}> start tag", el.tag));
            }
            if self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute()?;
            el.attrs.push((key, value));
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return Ok(MarkupNode::Element(el));
        }
        self.advance(); // '>'
        if is_void(&el.tag) {
            return Ok(MarkupNode::Element(el));
        }

        el.children = self.parse_nodes(Some(&el.tag))?;

        // parse_nodes only returns on `</` for an open element.
        self.pos += 2;
        let closing = self.parse_name().to_ascii_lowercase();
        if closing != el.tag {
            return Err(format!("</{closing}> does not close <{}>", el.tag));
        }
        self.skip_whitespace();
        if !self.starts_with(">") {
            return Err(format!("malformed </{closing}>"));
        }
        self.advance();
        Ok(MarkupNode::Element(el))
    }

    fn parse_name(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_attribute(&mut self) -> Result<(String, String), String> {
        let key = self.parse_name().to_ascii_lowercase();
        if key.is_empty() {
            return Err(format!("expected attribute name at byte {}", self.pos));
        }
        self.skip_whitespace();
        if !self.starts_with("=") {
            return Ok((key, String::new()));
        }
        self.advance(); // '='
        self.skip_whitespace();
        let value = match self.current_char() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let start = self.pos;
                while matches!(self.current_char(), Some(c) if c != quote) {
                    self.advance();
                }
                if self.eof() {
                    return Err(format!("unterminated value for attribute {key}"));
                }
                let raw = &self.input[start..self.pos];
                self.advance();
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while matches!(self.current_char(), Some(c) if !c.is_whitespace() && c != '>') {
                    self.advance();
                }
                decode_entities(&self.input[start..self.pos])
            }
        };
        Ok((key, value))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        self.pos += 4; // "<!--"
        match self.input[self.pos..].find("-->") {
            Some(end) => self.pos += end + 3,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_past(&mut self, c: char) {
        match self.input[self.pos..].find(c) {
            Some(end) => self.pos += end + c.len_utf8(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Describe the first node where `expected` and `actual` differ, if any.
///
/// The description is a path like `div[0]/section[2]/#text[0]`.
pub fn first_difference(expected: &[MarkupNode], actual: &[MarkupNode]) -> Option<String> {
    diff_siblings(expected, actual, "")
}

fn diff_siblings(expected: &[MarkupNode], actual: &[MarkupNode], path: &str) -> Option<String> {
    for (i, pair) in expected.iter().zip(actual).enumerate() {
        let here = match pair.0 {
            MarkupNode::Element(e) => format!("{path}/{}[{i}]", e.tag),
            MarkupNode::Text(_) => format!("{path}/#text[{i}]"),
        };
        match pair {
            (MarkupNode::Text(a), MarkupNode::Text(b)) if a != b => {
                return Some(format!("{here}: text {a:?} != {b:?}"));
            }
            (MarkupNode::Text(_), MarkupNode::Text(_)) => {}
            (MarkupNode::Element(a), MarkupNode::Element(b)) => {
                if a.tag != b.tag {
                    return Some(format!("{here}: <{}> != <{}>", a.tag, b.tag));
                }
                if a.attrs != b.attrs {
                    return Some(format!("{here}: attributes {:?} != {:?}", a.attrs, b.attrs));
                }
                if let Some(d) = diff_siblings(&a.children, &b.children, &here) {
                    return Some(d);
                }
            }
            _ => return Some(format!("{here}: node kind differs")),
        }
    }
    if expected.len() != actual.len() {
        return Some(format!(
            "{path}: {} children != {} children",
            expected.len(),
            actual.len()
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, attrs: &[(&str, &str)], children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::Element(Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        })
    }

    fn text(s: &str) -> MarkupNode {
        MarkupNode::Text(s.to_string())
    }

    #[test]
    fn serialises_void_and_escapes() {
        let tree = vec![el(
            "div",
            &[("class", "a\"b"), ("data-x", "<&>")],
            vec![text("1 < 2 & 3"), el("img", &[("src", "x.png")], vec![])],
        )];
        assert_eq!(
            to_html(&tree),
            concat!(
                r#"<div class="a&quot;b" data-x="&lt;&amp;&gt;">"#,
                r#"1 &lt; 2 &amp; 3<img src="x.png"></div>"#
            )
        );
    }

    #[test]
    fn parse_round_trips_serialisation() {
        let tree = vec![
            el(
                "section",
                &[("id", "couple"), ("class", "py-8")],
                vec![
                    el("h1", &[], vec![text("Alifah & Faris")]),
                    el("p", &[], vec![text("\"quoted\" <tag> it's")]),
                    el("input", &[("required", "")], vec![]),
                ],
            ),
            text("tail"),
        ];
        let parsed = parse_fragment(&to_html(&tree)).unwrap();
        assert_eq!(parsed, tree);
        assert_eq!(first_difference(&tree, &parsed), None);
    }

    #[test]
    fn parse_simple_div() {
        let nodes = parse_fragment(r#"<div class="flex p-4"><p>Hello</p></div>"#).unwrap();
        assert_eq!(nodes.len(), 1);
        if let MarkupNode::Element(e) = &nodes[0] {
            assert_eq!(e.tag, "div");
            assert_eq!(e.attr("class"), Some("flex p-4"));
            assert_eq!(e.children.len(), 1);
        } else {
            panic!("Expected element");
        }
    }

    #[test]
    fn parse_self_closing_and_bare_attributes() {
        let nodes = parse_fragment(r#"<img src=logo.png /><br>"#).unwrap();
        assert_eq!(
            nodes,
            vec![
                el("img", &[("src", "logo.png")], vec![]),
                el("br", &[], vec![])
            ]
        );
    }

    #[test]
    fn parse_drops_comments_and_merges_text() {
        let nodes = parse_fragment("a<!-- gap -->b").unwrap();
        assert_eq!(nodes, vec![text("ab")]);
    }

    #[test]
    fn parse_rejects_mismatched_close() {
        assert!(parse_fragment("<div><span></div></span>").is_err());
        assert!(parse_fragment("<div>").is_err());
        assert!(parse_fragment("</div>").is_err());
    }

    #[test]
    fn push_normalizes_text() {
        let mut parent = Element::new("p");
        parent.push(text("Hello "));
        parent.push(text(""));
        parent.push(text("world"));
        assert_eq!(parent.children, vec![text("Hello world")]);
    }

    #[test]
    fn nesting_rules() {
        assert!(check_nesting(&["div", "p"], "span").is_ok());
        assert!(check_nesting(&["div", "p"], "div").is_err());
        assert!(check_nesting(&["button"], "a").is_err());
        assert!(check_nesting(&["table"], "tr").is_err());
        assert!(check_nesting(&["table", "tbody"], "tr").is_ok());
        assert!(check_nesting(&["div"], "script").is_err());
        assert!(check_nesting(&["h2"], "h3").is_err());
        assert!(check_nesting(&["select"], "option").is_ok());
        assert!(check_nesting(&["select"], "div").is_err());
        assert_eq!(
            check_nesting(&["div", "img"], "span"),
            Err(RenderError::VoidWithChildren("img".into()))
        );
    }

    #[test]
    fn nesting_looks_past_the_parent() {
        fn owner(ancestors: &[&str], child: &str) -> Option<String> {
            match check_nesting(ancestors, child) {
                Err(RenderError::InvalidNesting { parent, .. }) => Some(parent),
                _ => None,
            }
        }
        assert_eq!(owner(&["div", "p", "span"], "div").as_deref(), Some("p"));
        assert_eq!(owner(&["div", "p", "b"], "li").as_deref(), Some("p"));
        assert_eq!(owner(&["form", "div"], "form").as_deref(), Some("form"));
        assert_eq!(owner(&["a", "span"], "a").as_deref(), Some("a"));
        assert_eq!(owner(&["button", "span"], "button").as_deref(), Some("button"));
        assert_eq!(owner(&["ul", "li", "div"], "li").as_deref(), Some("li"));
        assert_eq!(owner(&["dl", "dd", "span"], "dt").as_deref(), Some("dd"));
    }

    #[test]
    fn nesting_respects_scope_boundaries() {
        assert!(check_nesting(&["ul", "li", "ul"], "li").is_ok());
        assert!(check_nesting(&["p", "button"], "div").is_ok());
        assert!(check_nesting(&["div", "section"], "div").is_ok());
        assert!(check_nesting(&["a"], "span").is_ok());
    }

    #[test]
    fn tree_check_walks_descendants() {
        let tree = parse_fragment("<p><span><div>x</div></span></p>").unwrap();
        assert!(matches!(
            check_tree(&tree, &[MOUNT_TAG]),
            Err(RenderError::InvalidNesting { .. })
        ));
        let ok = parse_fragment("<ul><li><p>x</p><ul><li>y</li></ul></li></ul>").unwrap();
        assert_eq!(check_tree(&ok, &[MOUNT_TAG]), Ok(()));
    }

    #[test]
    fn difference_reports_path() {
        let a = vec![el("div", &[], vec![el("span", &[], vec![text("x")])])];
        let b = vec![el("div", &[], vec![el("span", &[], vec![text("y")])])];
        let d = first_difference(&a, &b).unwrap();
        assert!(d.starts_with("/div[0]/span[0]/#text[0]"), "{d}");
    }
}
