//! `aurora` – minimal single-page wedding card in English.

use serde_json::json;

use crate::content::{lookup_str, ContentTree};
use crate::view::{each, el, interp, when, ViewNode};

use super::TemplateDescriptor;

const STYLESHEET: &str = r#"
.iv-aurora{font-family:'Lora',Georgia,serif;color:#1f2937;
  background:linear-gradient(180deg,#eef2ff,#fdf2f8)}
.iv-aurora h1{font-family:'Great Vibes',cursive}
.iv-thanks{display:none}
.iv-thanks.is-open{display:block}
form.is-hidden{display:none}
"#;

fn title(content: &ContentTree) -> String {
    let names: Vec<&str> = ["couple.partnerOne", "couple.partnerTwo"]
        .iter()
        .filter_map(|p| lookup_str(content, p))
        .filter(|s| !s.trim().is_empty())
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!("{} are getting married", names.join(" & "))
    }
}

fn view() -> Vec<ViewNode> {
    vec![el("div")
        .class("iv-aurora min-h-screen flex flex-col items-center px-6 py-16 text-center")
        .child(
            el("header")
                .child(
                    el("p")
                        .class("uppercase tracking-widest text-xs")
                        .text("Together with their families"),
                )
                .child(
                    el("h1")
                        .class("text-6xl my-6")
                        .child(interp("{content.couple.partnerOne} & {content.couple.partnerTwo}")),
                )
                .child(el("p").class("text-lg").bind("meta.eventDateDisplay")),
        )
        .child(when(
            "content.message",
            vec![el("p").class("max-w-md my-8 italic").bind("content.message").build()],
        ))
        .child(
            el("section")
                .id("venue")
                .class("my-8")
                .child(el("h2").class("text-2xl font-semibold").bind("content.venue.name"))
                .child(el("p").bind("content.venue.address"))
                .child(when(
                    "content.venue.time",
                    vec![el("p").class("mt-1").bind("content.venue.time").build()],
                ))
                .child(when(
                    "content.venue.mapUrl",
                    vec![el("a")
                        .attr("href", "{content.venue.mapUrl}")
                        .attr("target", "_blank")
                        .attr("rel", "noopener")
                        .class("inline-block mt-3 underline")
                        .text("Open map")
                        .build()],
                )),
        )
        .child(when(
            "content.schedule",
            vec![el("ol")
                .class("my-6 space-y-1")
                .child(each(
                    "content.schedule",
                    "item",
                    vec![el("li")
                        .child(el("strong").bind("item.time"))
                        .child(interp(" {item.label}"))
                        .build()],
                ))
                .build()],
        ))
        .child(
            el("section")
                .id("rsvp")
                .class("w-full max-w-sm my-8")
                .child(el("h2").class("text-2xl mb-4").text("Kindly reply"))
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
                            el("select")
                                .attr("name", "attendance")
                                .class("border rounded px-3 py-2")
                                .child(el("option").attr("value", "yes").text("Joyfully accepts"))
                                .child(
                                    el("option").attr("value", "no").text("Regretfully declines"),
                                ),
                        )
                        .child(
                            el("button")
                                .attr("type", "submit")
                                .class("py-2 rounded bg-indigo-600 text-white")
                                .text("Send"),
                        ),
                )
                .child(
                    el("p")
                        .id("rsvp-thanks")
                        .class("iv-thanks")
                        .text("Thank you, we can't wait to see you."),
                ),
        )
        .build()]
}

fn default_content() -> serde_json::Value {
    json!({
        "locale": "en",
        "couple": { "partnerOne": "Alifah", "partnerTwo": "Faris" },
        "eventDate": "2025-11-23",
        "eventTime": "16:00",
        "message": "We would be honoured by your presence as we begin our life together.",
        "venue": {
            "name": "The Glasshouse",
            "address": "12 Orchard Lane",
            "time": "4 pm",
            "mapUrl": ""
        },
        "schedule": [
            { "time": "4:00", "label": "Ceremony" },
            { "time": "5:30", "label": "Dinner" }
        ]
    })
}

pub fn descriptor() -> TemplateDescriptor {
    TemplateDescriptor::new("aurora", "Aurora", view(), title, STYLESHEET, default_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_joins_present_names() {
        assert_eq!(
            title(&json!({ "couple": { "partnerOne": "Ana", "partnerTwo": "Ben" } })),
            "Ana & Ben are getting married"
        );
        assert_eq!(
            title(&json!({ "couple": { "partnerOne": "Ana", "partnerTwo": " " } })),
            "Ana are getting married"
        );
        assert_eq!(title(&json!({})), "");
    }

    #[test]
    fn english_locale_formats_date_in_english() {
        let d = descriptor();
        let meta = d.derive_metadata(&d.default_content);
        assert_eq!(meta.event_date_display.as_deref(), Some("Sunday, 23 November 2025"));
        assert_eq!(meta.slug, "alifah-faris-are-getting-married");
    }
}
