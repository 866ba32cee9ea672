//! Normattiva extractor (C6, spec §4.6).
//!
//! Four-scenario state machine keyed on the CSS classes present inside
//! `div.bodyTesto`, dispatched in the order the spec lists them so the
//! most specific (AKN) layouts are tried before the generic fallback.

use legalnorm_core::{CanonicalUrn, LegalNormError, LegalNormResult, ResolvedArticleText, SourceTag};
use scraper::{Html, Selector};
use std::collections::HashMap;

use crate::text_walker::extract_text;

const FALLBACK_TEXT: &str = "[Articolo senza contenuto o abrogato]";

enum Scenario {
    DetailedAkn,
    SimpleAkn,
    Attachment,
    Fallback,
}

fn detect_scenario(body: &scraper::ElementRef) -> Scenario {
    let has_class = |class: &str| -> bool {
        let selector = Selector::parse(&format!(".{class}")).unwrap();
        body.select(&selector).next().is_some()
    };
    if has_class("art-comma-div-akn") {
        Scenario::DetailedAkn
    } else if has_class("art-just-text-akn") {
        Scenario::SimpleAkn
    } else if has_class("attachment-just-text") {
        Scenario::Attachment
    } else {
        Scenario::Fallback
    }
}

/// Extracts the article text from a Normattiva article page's HTML
/// (spec §4.6). `with_links` requests a best-effort anchor→href map.
pub fn extract_article(html: &str, urn: &CanonicalUrn, with_links: bool) -> LegalNormResult<ResolvedArticleText> {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("div.bodyTesto").unwrap();
    let body = document
        .select(&body_selector)
        .next()
        .ok_or_else(|| LegalNormError::parsing("normattiva: missing div.bodyTesto", html))?;

    let mut link_map = HashMap::new();
    let links = if with_links { Some(&mut link_map) } else { None };

    let text = match detect_scenario(&body) {
        Scenario::DetailedAkn => extract_detailed_akn(&document, links),
        Scenario::SimpleAkn => extract_simple_akn(&document, links),
        Scenario::Attachment => extract_attachment(&document, links),
        Scenario::Fallback => {
            let text = extract_text(body, links);
            if text.trim().is_empty() {
                FALLBACK_TEXT.to_string()
            } else {
                text
            }
        }
    };

    Ok(ResolvedArticleText {
        text,
        urn: urn.clone(),
        link_map: if with_links { Some(link_map) } else { None },
        source: SourceTag::Normattiva,
    })
}

fn extract_detailed_akn(document: &Html, mut link_map: Option<&mut HashMap<String, String>>) -> String {
    let mut out = String::new();
    if let Some(number) = select_first_text(document, "h2.article-num-akn") {
        out.push_str(&number);
        out.push('\n');
    }
    if let Some(title) = select_first_text(document, "div.article-heading-akn") {
        out.push_str(&title);
        out.push('\n');
    }
    let comma_selector = Selector::parse("div.art-comma-div-akn").unwrap();
    for comma in document.select(&comma_selector) {
        out.push_str(&extract_text(comma, link_map.as_deref_mut()));
        out.push('\n');
    }
    out.trim().to_string()
}

fn extract_simple_akn(document: &Html, mut link_map: Option<&mut HashMap<String, String>>) -> String {
    let mut out = String::new();
    if let Some(number) = select_first_text(document, "h2.article-num-akn") {
        out.push_str(&number);
        out.push('\n');
    }
    if let Some(title) = select_first_text(document, "div.article-heading-akn") {
        out.push_str(&title);
        out.push('\n');
    }
    let span_selector = Selector::parse("span.art-just-text-akn").unwrap();
    if let Some(span) = document.select(&span_selector).next() {
        out.push_str(&extract_text(span, link_map.as_deref_mut()));
    }
    out.trim().to_string()
}

fn extract_attachment(document: &Html, mut link_map: Option<&mut HashMap<String, String>>) -> String {
    let mut out = String::new();
    let span_selector = Selector::parse("span.attachment-just-text").unwrap();
    if let Some(span) = document.select(&span_selector).next() {
        out.push_str(&extract_text(span, link_map.as_deref_mut()));
    }
    let update_selector = Selector::parse("div.art_aggiornamento-akn").unwrap();
    for block in document.select(&update_selector) {
        out.push('\n');
        out.push_str(&extract_text(block, link_map.as_deref_mut()));
    }
    out.trim().to_string()
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(|el| extract_text(el, None))
}

/// Appends (or replaces) the version suffix on a base URN, stripping any
/// existing `@originale`/`!vig=` suffix first (spec §4.6 "Versioned and
/// original fetches").
pub fn with_version_suffix(base_urn: &str, suffix: &str) -> String {
    let stripped = base_urn
        .split("@originale")
        .next()
        .and_then(|s| s.split("!vig=").next())
        .unwrap_or(base_urn);
    format!("{stripped}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urn() -> CanonicalUrn {
        CanonicalUrn::Nir("urn:nir:stato:legge:1990-08-07;241~art2".to_string())
    }

    #[test]
    fn detailed_akn_scenario_assembles_number_title_and_commas() {
        let html = r#"
            <html><body><div class="bodyTesto">
                <h2 class="article-num-akn">Art. 2.</h2>
                <div class="article-heading-akn">Diritto di accesso</div>
                <div class="art-comma-div-akn"><p>Primo comma.</p></div>
                <div class="art-comma-div-akn"><p>Secondo comma.</p></div>
            </div></body></html>
        "#;
        let result = extract_article(html, &urn(), false).unwrap();
        assert!(result.text.contains("Art. 2."));
        assert!(result.text.contains("Primo comma."));
        assert!(result.text.contains("Secondo comma."));
    }

    #[test]
    fn simple_akn_scenario_reads_single_span() {
        let html = r#"
            <html><body><div class="bodyTesto">
                <h2 class="article-num-akn">Art. 1.</h2>
                <span class="art-just-text-akn">Testo semplice.</span>
            </div></body></html>
        "#;
        let result = extract_article(html, &urn(), false).unwrap();
        assert!(result.text.contains("Testo semplice."));
    }

    #[test]
    fn attachment_scenario_appends_update_blocks() {
        let html = r#"
            <html><body><div class="bodyTesto">
                <span class="attachment-just-text">Allegato base.</span>
                <div class="art_aggiornamento-akn">Aggiornamento 1.</div>
            </div></body></html>
        "#;
        let result = extract_article(html, &urn(), false).unwrap();
        assert!(result.text.contains("Allegato base."));
        assert!(result.text.contains("Aggiornamento 1."));
    }

    #[test]
    fn fallback_scenario_emits_sentinel_when_empty() {
        let html = r#"<html><body><div class="bodyTesto"></div></body></html>"#;
        let result = extract_article(html, &urn(), false).unwrap();
        assert_eq!(result.text, FALLBACK_TEXT);
    }

    #[test]
    fn missing_body_is_a_parsing_error() {
        let html = "<html><body><div class=\"nope\"></div></body></html>";
        let err = extract_article(html, &urn(), false).unwrap_err();
        assert!(matches!(err, LegalNormError::Parsing { .. }));
    }

    #[test]
    fn with_links_populates_link_map() {
        let html = r#"
            <html><body><div class="bodyTesto">
                <span class="art-just-text-akn">vedi <a href="/art5.html">art. 5</a></span>
            </div></body></html>
        "#;
        let result = extract_article(html, &urn(), true).unwrap();
        assert_eq!(
            result.link_map.unwrap().get("art. 5"),
            Some(&"/art5.html".to_string())
        );
    }

    #[test]
    fn version_suffix_replaces_existing_one() {
        let base = "urn:nir:stato:legge:1990-08-07;241~art2@originale";
        assert_eq!(
            with_version_suffix(base, "!vig=2020-01-01"),
            "urn:nir:stato:legge:1990-08-07;241~art2!vig=2020-01-01"
        );
    }
}
