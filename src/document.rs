//! Document assembler – stitches markup, payload, script and head resources
//! into the final HTML file.
//!
//! Layout of every artifact:
//!
//! ```text
//! <!DOCTYPE html>
//! <html lang="..">
//! <head> charset, viewport, title, description, resource links, <style> </head>
//! <body>
//! <div id="invitation-root">{markup}</div>
//! <script id="invitation-data" type="application/json">{payload}</script>
//! <script>{hydration entry}</script>
//! </body>
//! </html>
//! ```

use crate::bundle::{DATA_ID, ROOT_ID};
use crate::config::{ResourceKind, ResourceLink};
use crate::error::AssemblyInvariantViolation;
use crate::markup::{escape_attr, escape_text};

/// Head content for one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentHead<'a> {
    pub lang: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    /// Template CSS, placed in a `<style>` element after the links.
    pub stylesheet: &'a str,
    /// Links that already passed the host whitelist.
    pub resources: Vec<&'a ResourceLink>,
}

fn root_open() -> String {
    format!("<div id=\"{ROOT_ID}\">")
}

fn data_open() -> String {
    format!("<script id=\"{DATA_ID}\" type=\"application/json\">")
}

const HYDRATE_OPEN: &str = "<script>";

/// Assemble the document. `payload` must already be script-escaped JSON and
/// `script` an embeddable entry.
pub fn assemble(
    head: &DocumentHead<'_>,
    markup: &str,
    payload: &str,
    script: &str,
) -> Result<String, AssemblyInvariantViolation> {
    let mut html = String::with_capacity(
        markup.len() + payload.len() + script.len() + head.stylesheet.len() + 1024,
    );

    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!("<html lang=\"{}\">\n", escape_attr(head.lang)));
    html.push_str("<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_text(head.title)));
    html.push_str(&format!(
        "<meta name=\"description\" content=\"{}\">\n",
        escape_attr(head.description)
    ));
    for link in &head.resources {
        let href = escape_attr(&link.href);
        let tag = match link.kind {
            ResourceKind::Preconnect => format!("<link rel=\"preconnect\" href=\"{href}\">"),
            ResourceKind::Stylesheet => format!("<link rel=\"stylesheet\" href=\"{href}\">"),
            ResourceKind::Script => format!("<script src=\"{href}\"></script>"),
        };
        html.push_str(&tag);
        html.push('\n');
    }
    if !head.stylesheet.trim().is_empty() {
        html.push_str("<style>");
        html.push_str(head.stylesheet.trim());
        html.push_str("</style>\n");
    }
    html.push_str("</head>\n<body>\n");

    // No whitespace inside the root: the client compares its children
    // node-for-node.
    html.push_str(&root_open());
    html.push_str(markup);
    html.push_str("</div>\n");

    html.push_str(&data_open());
    html.push_str(payload);
    html.push_str("</script>\n");

    html.push_str(HYDRATE_OPEN);
    html.push_str(script);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>\n");

    verify_order(&html)?;
    Ok(html)
}

/// Check the structural guarantees of an assembled document: root element,
/// then payload element, then hydration script, each exactly once and inside
/// `<body>`.
pub fn verify_order(html: &str) -> Result<(), AssemblyInvariantViolation> {
    let root = find_once(html, &root_open(), "root element")?;
    let data = find_once(html, &data_open(), "data payload element")?;
    let hydrate = find_once(html, HYDRATE_OPEN, "hydration script")?;
    let body = find_once(html, "<body>", "body")?;

    if !(body < root && root < data && data < hydrate) {
        return Err(AssemblyInvariantViolation(format!(
            "expected body < root < payload < script, found {body} / {root} / {data} / {hydrate}"
        )));
    }
    // The payload must end at its own closing tag, before the hydration script.
    let payload_end = html[data..]
        .find("</script>")
        .map(|i| data + i)
        .ok_or_else(|| AssemblyInvariantViolation("payload element is not closed".into()))?;
    if payload_end > hydrate {
        return Err(AssemblyInvariantViolation(
            "payload element closes after the hydration script opens".into(),
        ));
    }
    Ok(())
}

fn find_once(html: &str, needle: &str, what: &str) -> Result<usize, AssemblyInvariantViolation> {
    let mut hits = html.match_indices(needle).map(|(i, _)| i);
    match (hits.next(), hits.next()) {
        (Some(i), None) => Ok(i),
        (None, _) => Err(AssemblyInvariantViolation(format!("{what} is missing"))),
        (Some(_), Some(_)) => Err(AssemblyInvariantViolation(format!(
            "{what} appears more than once"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> DocumentHead<'static> {
        DocumentHead {
            lang: "id",
            title: "Alifah & Faris",
            description: "Undangan \"pernikahan\"",
            stylesheet: ".a{color:red}",
            resources: Vec::new(),
        }
    }

    #[test]
    fn assembles_in_order() {
        let html = assemble(&head(), "<p>hi</p>", "{}", "void 0").unwrap();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"id\">"));
        assert!(html.contains("<title>Alifah &amp; Faris</title>"));
        assert!(html.contains("content=\"Undangan &quot;pernikahan&quot;\""));
        assert!(html.contains("<div id=\"invitation-root\"><p>hi</p></div>"));
        let data = html.find("id=\"invitation-data\"").unwrap();
        let script = html.find("<script>void 0</script>").unwrap();
        assert!(data < script);
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn resource_links_render_by_kind() {
        let links = [
            ResourceLink {
                kind: ResourceKind::Preconnect,
                href: "https://fonts.googleapis.com".into(),
            },
            ResourceLink::stylesheet("https://fonts.googleapis.com/css2?family=Lora&display=swap"),
            ResourceLink {
                kind: ResourceKind::Script,
                href: "https://cdn.tailwindcss.com".into(),
            },
        ];
        let head = DocumentHead {
            resources: links.iter().collect(),
            ..head()
        };
        let html = assemble(&head, "", "{}", "").unwrap();
        assert!(html.contains("<link rel=\"preconnect\" href=\"https://fonts.googleapis.com\">"));
        assert!(html.contains("family=Lora&amp;display=swap"));
        assert!(html.contains("<script src=\"https://cdn.tailwindcss.com\"></script>"));
        assert!(html.find("cdn.tailwindcss.com").unwrap() < html.find("<body>").unwrap());
    }

    #[test]
    fn rejects_markup_that_duplicates_the_root() {
        let err = assemble(&head(), "<div id=\"invitation-root\"></div>", "{}", "").unwrap_err();
        assert!(err.0.contains("root element"));
    }

    #[test]
    fn rejects_unescaped_payload() {
        let err = assemble(&head(), "", "{\"x\":\"</script><script>\"}", "").unwrap_err();
        assert!(err.0.contains("hydration script"));
    }
}
