//! `sakinah` – full wedding invitation: opening cover, couple, countdown,
//! events, photo carousel, background music, gift accounts and RSVP.

use serde_json::json;

use crate::content::{lookup_str, ContentTree};
use crate::view::{bind, each, el, interp, unless, when, ViewNode};

use super::TemplateDescriptor;

const STYLESHEET: &str = r#"
.iv-sakinah{font-family:'Lora',Georgia,serif;color:#4a3f35;background:#fbf7f0}
.iv-script{font-family:'Great Vibes',cursive}
.iv-cover{position:fixed;inset:0;z-index:40;display:flex;flex-direction:column;
  align-items:center;justify-content:center;text-align:center;background:#3d3229;
  color:#fbf7f0;transition:transform .8s ease,visibility .8s}
.iv-cover.is-open{transform:translateY(-100%);visibility:hidden}
.iv-carousel [data-slide]{display:none}
.iv-carousel [data-slide].is-active,
.iv-carousel:not(.is-ready) [data-slide]:first-child{display:block}
.iv-thanks{display:none}
.iv-thanks.is-open{display:block}
form.is-hidden{display:none}
.iv-music{position:fixed;right:1rem;bottom:1rem;z-index:30;border-radius:9999px}
.iv-music.is-playing{animation:iv-spin 4s linear infinite}
@keyframes iv-spin{to{transform:rotate(360deg)}}
[data-behavior=copy].is-copied::after{content:' ✓'}
"#;

fn title(content: &ContentTree) -> String {
    let bride = lookup_str(content, "couple.bride").unwrap_or_default();
    let groom = lookup_str(content, "couple.groom").unwrap_or_default();
    match (bride.is_empty(), groom.is_empty()) {
        (false, false) => format!("The Wedding of {bride} & {groom}"),
        (false, true) => format!("The Wedding of {bride}"),
        (true, false) => format!("The Wedding of {groom}"),
        (true, true) => String::new(),
    }
}

fn cover() -> ViewNode {
    el("section")
        .id("cover")
        .class("iv-cover px-6")
        .child(el("p").class("uppercase tracking-widest text-sm").text("Undangan Pernikahan"))
        .child(
            el("h1")
                .class("iv-script text-5xl my-6")
                .child(interp("{content.couple.bride} & {content.couple.groom}")),
        )
        .child(when(
            "content.guest",
            vec![el("p")
                .class("text-sm opacity-80")
                .child(interp("Kepada Yth. {content.guest}"))
                .build()],
        ))
        .child(
            el("button")
                .attr("type", "button")
                .attr("data-behavior", "toggle")
                .attr("data-target", "cover")
                .attr("data-audio", "music")
                .class("mt-8 px-6 py-2 rounded-full bg-amber-200 text-stone-800")
                .text("Buka Undangan"),
        )
        .build()
}

fn person(role: &str) -> ViewNode {
    el("div")
        .class("flex flex-col items-center")
        .child(when(
            &format!("content.couple.{role}Photo"),
            vec![el("img")
                .attr("src", &format!("{{content.couple.{role}Photo}}"))
                .attr("alt", &format!("{{content.couple.{role}}}"))
                .class("w-40 h-40 rounded-full object-cover mb-4")
                .build()],
        ))
        .child(
            el("h2")
                .class("iv-script text-4xl")
                .bind(&format!("content.couple.{role}")),
        )
        .child(when(
            &format!("content.couple.{role}Parents"),
            vec![el("p")
                .class("text-sm mt-2")
                .child(bind(&format!("content.couple.{role}Parents")))
                .build()],
        ))
        .build()
}

fn countdown_cell(unit: &str, label: &str) -> ViewNode {
    el("div")
        .class("px-3 py-2 rounded bg-white shadow")
        .child(
            el("span")
                .attr("data-unit", unit)
                .class("block text-2xl font-semibold")
                .text("--"),
        )
        .child(el("small").text(label))
        .build()
}

fn events() -> ViewNode {
    el("section")
        .id("event")
        .class("py-12 px-6 text-center")
        .child(el("h2").class("iv-script text-4xl mb-2").text("Save the Date"))
        .child(el("p").class("mb-6").bind("meta.eventDateDisplay"))
        .child(when(
            "meta.countdownTarget",
            vec![el("div")
                .attr("data-behavior", "countdown")
                .attr("data-target-time", "{meta.countdownTarget}")
                .class("flex justify-center gap-3 mb-8")
                .child(countdown_cell("days", "Hari"))
                .child(countdown_cell("hours", "Jam"))
                .child(countdown_cell("minutes", "Menit"))
                .child(countdown_cell("seconds", "Detik"))
                .build()],
        ))
        .child(each(
            "content.events",
            "ev",
            vec![el("article")
                .class("mb-6 p-6 rounded-lg bg-white shadow")
                .child(el("h3").class("text-xl font-semibold").bind("ev.name"))
                .child(when("ev.time", vec![el("p").bind("ev.time").build()]))
                .child(el("p").class("font-semibold mt-2").bind("ev.venue"))
                .child(when(
                    "ev.address",
                    vec![el("p").class("text-sm").bind("ev.address").build()],
                ))
                .child(when(
                    "ev.mapUrl",
                    vec![el("a")
                        .attr("href", "{ev.mapUrl}")
                        .attr("target", "_blank")
                        .attr("rel", "noopener")
                        .class("inline-block mt-3 underline")
                        .text("Lihat Lokasi")
                        .build()],
                ))
                .build()],
        ))
        .build()
}

fn gallery() -> ViewNode {
    when(
        "content.gallery",
        vec![el("section")
            .id("gallery")
            .class("py-12 px-6")
            .child(el("h2").class("iv-script text-4xl text-center mb-6").text("Galeri"))
            .child(
                el("div")
                    .attr("data-behavior", "carousel")
                    .class("iv-carousel relative max-w-xl mx-auto")
                    .child(
                        el("div").class("iv-track").child(each(
                            "content.gallery",
                            "photo",
                            vec![el("figure")
                                .attr("data-slide", "{loop.index}")
                                .child(
                                    el("img")
                                        .attr("src", "{photo.src}")
                                        .attr("alt", "{photo.caption}")
                                        .class("w-full rounded-lg"),
                                )
                                .child(when(
                                    "photo.caption",
                                    vec![el("figcaption")
                                        .class("text-center text-sm mt-2")
                                        .bind("photo.caption")
                                        .build()],
                                ))
                                .build()],
                        )),
                    )
                    .child(
                        el("div")
                            .class("flex justify-between mt-4")
                            .child(
                                el("button")
                                    .attr("type", "button")
                                    .attr("data-carousel-prev", "")
                                    .attr("aria-label", "Sebelumnya")
                                    .text("‹"),
                            )
                            .child(
                                el("button")
                                    .attr("type", "button")
                                    .attr("data-carousel-next", "")
                                    .attr("aria-label", "Berikutnya")
                                    .text("›"),
                            ),
                    )
                    .child(
                        el("div")
                            .attr("data-carousel-dots", "")
                            .class("flex justify-center gap-2 mt-2"),
                    ),
            )
            .build()],
    )
}

fn gifts() -> ViewNode {
    when(
        "content.gifts",
        vec![el("section")
            .id("gift")
            .class("py-12 px-6 text-center")
            .child(el("h2").class("iv-script text-4xl mb-6").text("Amplop Digital"))
            .child(each(
                "content.gifts",
                "acc",
                vec![el("div")
                    .class("mb-4 p-4 rounded-lg bg-white shadow")
                    .child(el("p").class("font-semibold").bind("acc.bank"))
                    .child(el("p").class("text-lg tracking-wider").bind("acc.number"))
                    .child(el("p").class("text-sm").child(interp("a.n. {acc.holder}")))
                    .child(
                        el("button")
                            .attr("type", "button")
                            .attr("data-behavior", "copy")
                            .attr("data-copy", "{acc.number}")
                            .class("mt-2 px-4 py-1 rounded-full border")
                            .text("Salin"),
                    )
                    .build()],
            ))
            .build()],
    )
}

fn rsvp() -> ViewNode {
    el("section")
        .id("rsvp")
        .class("py-12 px-6 max-w-md mx-auto")
        .child(el("h2").class("iv-script text-4xl text-center mb-6").text("Konfirmasi Kehadiran"))
        .child(
            el("form")
                .attr("data-behavior", "rsvp")
                .attr("data-target", "rsvp-thanks")
                .attr("data-key", "{meta.slug}")
                .class("flex flex-col gap-3")
                .child(
                    el("label")
                        .class("flex flex-col text-sm")
                        .text("Nama")
                        .child(
                            el("input")
                                .attr("name", "name")
                                .attr("value", "{content.guest}")
                                .attr("required", "")
                                .class("border rounded px-3 py-2"),
                        ),
                )
                .child(
                    el("select")
                        .attr("name", "attendance")
                        .class("border rounded px-3 py-2")
                        .child(el("option").attr("value", "yes").text("Hadir"))
                        .child(el("option").attr("value", "no").text("Tidak Hadir")),
                )
                .child(
                    el("textarea")
                        .attr("name", "message")
                        .attr("rows", "3")
                        .attr("placeholder", "Ucapan & doa")
                        .class("border rounded px-3 py-2"),
                )
                .child(
                    el("button")
                        .attr("type", "submit")
                        .class("py-2 rounded bg-stone-800 text-white")
                        .text("Kirim"),
                ),
        )
        .child(
            el("p")
                .id("rsvp-thanks")
                .class("iv-thanks text-center")
                .text("Terima kasih atas konfirmasi Anda."),
        )
        .child(el("ul").attr("data-rsvp-list", "").class("mt-6 space-y-2"))
        .build()
}

fn music() -> ViewNode {
    when(
        "content.music",
        vec![
            el("audio")
                .id("music")
                .attr("src", "{content.music}")
                .attr("loop", "")
                .attr("preload", "none")
                .build(),
            el("button")
                .attr("type", "button")
                .attr("data-behavior", "audio")
                .attr("data-target", "music")
                .attr("aria-label", "Musik")
                .class("iv-music w-12 h-12 bg-amber-200 shadow")
                .text("♪")
                .build(),
        ],
    )
}

fn view() -> Vec<ViewNode> {
    vec![el("div")
        .class("iv-sakinah min-h-screen")
        .child(cover())
        .child(
            el("main")
                .child(when(
                    "content.cover.photo",
                    vec![el("img")
                        .attr("src", "{content.cover.photo}")
                        .attr("alt", "{meta.title}")
                        .class("w-full h-96 object-cover")
                        .build()],
                ))
                .child(
                    el("section")
                        .id("couple")
                        .class("py-12 px-6 text-center")
                        .child(when(
                            "content.opening",
                            vec![el("p").class("italic mb-8").bind("content.opening").build()],
                        ))
                        .child(unless(
                            "content.opening",
                            vec![el("p")
                                .class("italic mb-8")
                                .text(concat!(
                                    "Dengan memohon rahmat dan ridho Allah SWT, kami bermaksud ",
                                    "menyelenggarakan pernikahan putra-putri kami."
                                ))
                                .build()],
                        ))
                        .child(
                            el("div")
                                .class(
                                    "flex flex-col md:flex-row items-center justify-center gap-8",
                                )
                                .child(person("bride"))
                                .child(el("div").class("iv-script text-5xl").text("&"))
                                .child(person("groom")),
                        ),
                )
                .child(events())
                .child(gallery())
                .child(gifts())
                .child(rsvp())
                .child(
                    el("footer")
                        .class("py-8 text-center text-sm")
                        .child(el("p").bind("meta.title"))
                        .child(when(
                            "content.hashtag",
                            vec![el("p").bind("content.hashtag").build()],
                        )),
                ),
        )
        .child(music())
        .build()]
}

fn default_content() -> serde_json::Value {
    json!({
        "locale": "id",
        "guest": "",
        "couple": {
            "bride": "Alifah",
            "brideParents": "Putri dari Bapak Ahmad & Ibu Siti",
            "bridePhoto": "",
            "groom": "Faris",
            "groomParents": "Putra dari Bapak Hasan & Ibu Aminah",
            "groomPhoto": ""
        },
        "cover": { "photo": "" },
        "opening": "",
        "eventDate": "2025-11-23",
        "eventTime": "08:00",
        "events": [
            {
                "name": "Akad Nikah",
                "time": "08.00 - 10.00 WIB",
                "venue": "Masjid Al-Ikhlas",
                "address": "Jl. Merdeka No. 1, Bandung",
                "mapUrl": ""
            },
            {
                "name": "Resepsi",
                "time": "11.00 - 14.00 WIB",
                "venue": "Gedung Serbaguna",
                "address": "Jl. Merdeka No. 10, Bandung",
                "mapUrl": ""
            }
        ],
        "gallery": [],
        "gifts": [],
        "music": "",
        "hashtag": "#AlifahFarisForever"
    })
}

pub fn descriptor() -> TemplateDescriptor {
    TemplateDescriptor::new(
        "sakinah",
        "Sakinah",
        view(),
        title,
        STYLESHEET,
        default_content(),
    )
}
