//! `celebration` – birthday party invitation with a countdown and photo
//! carousel.

use serde_json::{json, Value};

use crate::content::{lookup, lookup_str, ContentTree};
use crate::view::{each, el, interp, text, when, ViewNode};

use super::TemplateDescriptor;

const STYLESHEET: &str = r#"
.iv-celebration{font-family:'Lora',Georgia,serif;color:#3b0764;background:#fdf4ff}
.iv-celebration h1{font-family:'Great Vibes',cursive}
.iv-carousel [data-slide]{display:none}
.iv-carousel [data-slide].is-active,
.iv-carousel:not(.is-ready) [data-slide]:first-child{display:block}
.iv-thanks{display:none}
.iv-thanks.is-open{display:block}
form.is-hidden{display:none}
"#;

/// `21` -> `21st`, `12` -> `12th`.
fn ordinal(n: u64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn title(content: &ContentTree) -> String {
    let name = lookup_str(content, "honoree.name").unwrap_or_default().trim();
    if name.is_empty() {
        return String::new();
    }
    // Only whole ages get a suffix; anything else drops the number.
    let age = match lookup(content, &["honoree", "age"]) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match age {
        Some(age) => format!("{name}'s {} Birthday", ordinal(age)),
        None => format!("{name}'s Birthday"),
    }
}

fn countdown_cell(unit: &str, label: &str) -> ViewNode {
    el("li")
        .class("px-3 py-2 rounded-lg bg-white shadow")
        .child(el("b").attr("data-unit", unit).class("block text-2xl").text("--"))
        .child(el("span").class("text-xs").text(label))
        .build()
}

fn view() -> Vec<ViewNode> {
    vec![el("div")
        .class("iv-celebration min-h-screen px-6 py-12 text-center")
        .child(
            el("header")
                .child(el("p").class("uppercase tracking-widest text-sm").text("You're invited"))
                .child(el("h1").class("text-6xl my-4").bind("meta.title"))
                .child(when(
                    "content.honoree.photo",
                    vec![el("img")
                        .attr("src", "{content.honoree.photo}")
                        .attr("alt", "{content.honoree.name}")
                        .class("mx-auto w-48 h-48 rounded-full object-cover")
                        .build()],
                )),
        )
        .child(
            el("section")
                .id("when")
                .class("my-8")
                .child(el("p").class("text-lg").bind("meta.eventDateDisplay"))
                .child(when(
                    "content.eventTime",
                    vec![el("p").child(interp("at {content.eventTime}")).build()],
                ))
                .child(when(
                    "meta.countdownTarget",
                    vec![el("ul")
                        .attr("data-behavior", "countdown")
                        .attr("data-target-time", "{meta.countdownTarget}")
                        .class("flex justify-center gap-3 mt-6")
                        .child(countdown_cell("days", "days"))
                        .child(countdown_cell("hours", "hours"))
                        .child(countdown_cell("minutes", "min"))
                        .child(countdown_cell("seconds", "sec"))
                        .build()],
                )),
        )
        .child(when(
            "content.gallery",
            vec![el("section")
                .id("gallery")
                .attr("data-behavior", "carousel")
                .attr("data-interval", "4000")
                .class("iv-carousel max-w-md mx-auto my-8")
                .child(each(
                    "content.gallery",
                    "photo",
                    vec![el("img")
                        .attr("data-slide", "{loop.index}")
                        .attr("src", "{photo}")
                        .attr("alt", "Photo {loop.number}")
                        .class("w-full rounded-xl")
                        .build()],
                ))
                .build()],
        ))
        .child(
            el("section")
                .id("venue")
                .class("my-8")
                .child(el("h2").class("text-2xl font-semibold").bind("content.venue.name"))
                .child(el("p").bind("content.venue.address"))
                .child(when(
                    "content.venue.mapUrl",
                    vec![el("a")
                        .attr("href", "{content.venue.mapUrl}")
                        .attr("target", "_blank")
                        .attr("rel", "noopener")
                        .class("underline")
                        .text("Directions")
                        .build()],
                ))
                .child(when(
                    "content.dressCode",
                    vec![el("p")
                        .class("mt-2 text-sm")
                        .text("Dress code: ")
                        .bind("content.dressCode")
                        .build()],
                )),
        )
        .child(
            el("section")
                .id("rsvp")
                .class("max-w-sm mx-auto my-8")
                .child(
                    el("form")
                        .attr("data-behavior", "rsvp")
                        .attr("data-target", "rsvp-thanks")
                        .attr("data-key", "{meta.slug}")
                        .class("flex flex-col gap-3")
                        .child(
                            el("input")
                                .attr("name", "name")
                                .attr("placeholder", "Your name")
                                .attr("required", "")
                                .class("border rounded px-3 py-2"),
                        )
                        .child(
                            el("input")
                                .attr("name", "guests")
                                .attr("type", "number")
                                .attr("min", "1")
                                .attr("value", "1")
                                .class("border rounded px-3 py-2"),
                        )
                        .child(
                            el("button")
                                .attr("type", "submit")
                                .class("py-2 rounded-full bg-fuchsia-600 text-white")
                                .text("I'll be there"),
                        ),
                )
                .child(
                    el("p")
                        .id("rsvp-thanks")
                        .class("iv-thanks")
                        .child(text("See you at the party!")),
                )
                .child(el("ul").attr("data-rsvp-list", "").class("mt-4 text-sm")),
        )
        .build()]
}

fn default_content() -> serde_json::Value {
    json!({
        "locale": "en",
        "honoree": { "name": "Naya", "age": 7, "photo": "" },
        "eventDate": "2025-12-06",
        "eventTime": "15:00",
        "gallery": [],
        "venue": { "name": "Rainbow Park Pavilion", "address": "Jl. Pelangi 3", "mapUrl": "" },
        "dressCode": "Anything sparkly"
    })
}

pub fn descriptor() -> TemplateDescriptor {
    TemplateDescriptor::new(
        "celebration",
        "Celebration",
        view(),
        title,
        STYLESHEET,
        default_content(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    #[test]
    fn title_includes_age_when_present() {
        assert_eq!(
            title(&json!({ "honoree": { "name": "Naya", "age": 7 } })),
            "Naya's 7th Birthday"
        );
        assert_eq!(title(&json!({ "honoree": { "name": "Naya" } })), "Naya's Birthday");
        assert_eq!(title(&json!({ "honoree": { "age": 7 } })), "");
    }

    #[test]
    fn ages_take_english_ordinals() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (101, "101st"),
            (111, "111th"),
            (112, "112th"),
        ];
        for (age, expected) in cases {
            assert_eq!(
                title(&json!({ "honoree": { "name": "Raka", "age": age } })),
                format!("Raka's {expected} Birthday")
            );
        }
        assert_eq!(
            title(&json!({ "honoree": { "name": "Raka", "age": "2" } })),
            "Raka's 2nd Birthday"
        );
    }

    #[test]
    fn non_whole_ages_are_left_out() {
        for age in [json!(2.5), json!(-3), json!("two"), json!(true)] {
            assert_eq!(
                title(&json!({ "honoree": { "name": "Raka", "age": age } })),
                "Raka's Birthday"
            );
        }
    }

    #[test]
    fn gallery_slides_are_numbered() {
        let d = descriptor();
        let content = json!({
            "honoree": { "name": "Naya" },
            "gallery": ["data:image/png;base64,AA==", "data:image/png;base64,AQ=="],
        });
        let meta = d.derive_metadata(&content);
        let html = render(&d, &content, &meta).unwrap();
        assert!(html.contains(r#"data-slide="0""#));
        assert!(html.contains(r#"data-slide="1""#));
        assert!(html.contains(r#"alt="Photo 2""#));
    }
}
