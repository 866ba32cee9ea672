//! EUR-Lex extractor (C7, spec §4.7).
//!
//! EUR-Lex sits behind a WAF that blocks plain HTTP; every fetch goes
//! through the injectable `HeadlessBrowser` seam shared with C5. Once
//! the HTML is in hand, article location tries five strategies in
//! order and the first hit wins.

use legalnorm_core::{LegalNormError, LegalNormResult};
use legalnorm_fetch::HeadlessBrowser;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

static ARTICLE_HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(articolo|article|art\.)\s+(\d+)\b").unwrap());

/// Fetches and extracts an EUR-Lex article (spec §4.7).
pub struct EurLexExtractor {
    browser: Arc<dyn HeadlessBrowser>,
}

impl EurLexExtractor {
    pub fn new(browser: Arc<dyn HeadlessBrowser>) -> Self {
        Self { browser }
    }

    pub async fn fetch_article(&self, url: &str, article_number: &str) -> LegalNormResult<String> {
        let html = self.browser.rendered_html(url).await?;
        extract_article(&html, article_number)
    }
}

/// Locates and assembles the article body out of already-fetched HTML
/// (kept separate from the network fetch so it can be unit-tested
/// without a browser backend).
pub fn extract_article(html: &str, article_number: &str) -> LegalNormResult<String> {
    let document = Html::parse_document(html);
    let header = locate_header(&document, article_number)
        .ok_or_else(|| LegalNormError::not_found(format!("eur-lex article {article_number}")))?;

    Ok(collect_until_next_header(header))
}

fn locate_header<'a>(document: &'a Html, article_number: &str) -> Option<ElementRef<'a>> {
    // Strategy 1: p.ti-art whose text starts with Articolo/Article/Art.
    let ti_art_selector = Selector::parse("p.ti-art").unwrap();
    if let Some(el) = document
        .select(&ti_art_selector)
        .find(|el| header_matches(el, article_number))
    {
        return Some(el);
    }

    // Strategy 2: any element whose class contains "art" or "title".
    let all_selector = Selector::parse("*").unwrap();
    if let Some(el) = document.select(&all_selector).find(|el| {
        let class = el.value().attr("class").unwrap_or("");
        (class.contains("art") || class.contains("title")) && header_matches(el, article_number)
    }) {
        return Some(el);
    }

    // Strategy 3: any p|div|span|hN whose text matches the header regex.
    let tag_selector = Selector::parse("p, div, span, h1, h2, h3, h4, h5, h6").unwrap();
    if let Some(el) = document
        .select(&tag_selector)
        .find(|el| header_matches(el, article_number))
    {
        return Some(el);
    }

    // Strategy 4: div.eli-subdivision containing a matching header.
    let subdivision_selector = Selector::parse("div.eli-subdivision").unwrap();
    document.select(&subdivision_selector).find(|el| {
        el.descendants()
            .filter_map(scraper::ElementRef::wrap)
            .any(|child| header_matches(&child, article_number))
    })
}

fn header_matches(el: &ElementRef, article_number: &str) -> bool {
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    let trimmed = text.trim();
    match ARTICLE_HEADER_PATTERN.captures(trimmed) {
        Some(caps) => &caps[2] == article_number,
        None => false,
    }
}

fn is_article_header(el: &ElementRef) -> bool {
    let class = el.value().attr("class").unwrap_or("");
    if class.split_whitespace().any(|c| c == "ti-art") {
        return true;
    }
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    ARTICLE_HEADER_PATTERN.is_match(text.trim())
}

fn collect_until_next_header(start: ElementRef) -> String {
    let mut out = String::new();
    out.push_str(&render_element(&start));
    out.push('\n');

    let mut next = start.next_sibling();
    while let Some(node) = next {
        if let Some(el) = scraper::ElementRef::wrap(node) {
            if is_article_header(&el) {
                break;
            }
            if el.value().name() == "table" {
                out.push_str(&render_table(&el));
            } else {
                out.push_str(&el.text().collect::<Vec<_>>().join(" "));
            }
            out.push('\n');
        }
        next = node.next_sibling();
    }
    out.trim().to_string()
}

fn render_element(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn render_table(table: &ElementRef) -> String {
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td, th").unwrap();
    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|c| c.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .collect();
        rows.push(cells.join(" "));
    }
    rows.join("\n")
}
