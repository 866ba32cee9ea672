//! Recursive HTML text walker (spec §4.6, §9).
//!
//! Shared by every Normattiva scenario: `<br>` becomes a newline, `<p>`
//! gets a trailing newline, `<li>` is prefixed `" - "` and suffixed with
//! a newline, `<a>` passes its text through while optionally recording
//! anchor text → href, everything else passes through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};
use std::collections::HashMap;

static RUNS_OF_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RUNS_OF_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Walks every descendant of `root`, assembling its rendered text.
/// When `link_map` is `Some`, every `<a href>` encountered records its
/// trimmed anchor text as a key.
pub fn extract_text(root: ElementRef, mut link_map: Option<&mut HashMap<String, String>>) -> String {
    let mut raw = String::new();
    for child in root.children() {
        raw.push_str(&walk_node(child, &mut link_map));
    }
    postprocess(&raw)
}

fn walk_node(node: ego_tree::NodeRef<'_, Node>, link_map: &mut Option<&mut HashMap<String, String>>) -> String {
    match node.value() {
        Node::Text(text) => text.to_string(),
        Node::Element(elem) => {
            let mut inner = String::new();
            for child in node.children() {
                inner.push_str(&walk_node(child, link_map));
            }
            match elem.name() {
                "br" => "\n".to_string(),
                "p" => format!("{inner}\n"),
                "li" => format!(" - {inner}\n"),
                "a" => {
                    if let (Some(map), Some(href)) = (link_map.as_mut(), elem.attr("href")) {
                        let text = inner.trim();
                        if !text.is_empty() {
                            map.insert(text.to_string(), href.to_string());
                        }
                    }
                    inner
                }
                _ => inner,
            }
        }
        _ => String::new(),
    }
}

fn postprocess(raw: &str) -> String {
    let collapsed_newlines = RUNS_OF_NEWLINES.replace_all(raw, "\n\n");
    RUNS_OF_HSPACE.replace_all(&collapsed_newlines, " ").trim().to_string()
}
