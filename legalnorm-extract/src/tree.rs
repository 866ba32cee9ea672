//! Tree extractor (C10, spec §4.10).
//!
//! Normattiva side is modeled as a small automaton over a stream of
//! `<li>` events (spec §9 "Stateful tree iteration"): `current_attachment`,
//! a monotonically increasing `annex_counter`, and an `in_allegati_section`
//! flag. EUR-Lex side is a class-based structural scan with a text-pattern
//! fallback.

use legalnorm_core::{AnnexMetadata, TreeEntry, TreeMetadata, TreeResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

static ALLEGATO_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)allegato\s+(\w+)").unwrap());
static EURLEX_HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(articolo|article|art\.)\s+(\d+)\b").unwrap());

/// The automaton's event alphabet (spec §9 "Stateful tree iteration").
/// Classification happens inline in `extract_normattiva_tree` against
/// each `<li>`'s class list; this enum documents the exhaustive set of
/// transitions that drives the loop.
#[allow(dead_code)]
enum LiEvent {
    BoxArticoli,
    LinkAllegato,
    BoxAllegati,
    BoxAllegatiSmall,
    SectionHeader,
    ArticleAnchor,
    Other,
}

#[derive(Default)]
struct TreeState {
    current_attachment: Option<String>,
    annex_counter: u32,
    in_allegati_section: bool,
}

/// Extracts a flat article list from a Normattiva act page (spec §4.10).
/// `base_urn` is the act's canonical URN with no article suffix, used to
/// build per-article URLs. `include_headers` requests section-header
/// entries alongside articles.
pub fn extract_normattiva_tree(html: &str, base_urn: &str, include_headers: bool, with_metadata: bool) -> TreeResult {
    let document = Html::parse_document(html);
    let albero_selector = Selector::parse("div#albero").unwrap();
    let Some(albero) = document.select(&albero_selector).next() else {
        return TreeResult { entries: Vec::new(), count: 0, metadata: None };
    };

    let li_selector = Selector::parse("li").unwrap();
    let article_selector = Selector::parse("a.numero_articolo").unwrap();
    let link_allegato_selector = Selector::parse("a.link_allegato").unwrap();
    let span_selector = Selector::parse("span").unwrap();

    let mut state = TreeState::default();
    let mut entries = Vec::new();
    let mut annexes: BTreeMap<String, AnnexMetadata> = BTreeMap::new();

    for li in albero.select(&li_selector) {
        let class = li.value().attr("class").unwrap_or("");
        let classes: Vec<&str> = class.split_whitespace().collect();
        let text: String = li.text().collect::<Vec<_>>().join(" ");

        if classes.contains(&"box_articoli") && text.to_lowercase().contains("allegat") {
            state.in_allegati_section = true;
        }

        if let Some(anchor) = li.select(&link_allegato_selector).next() {
            let anchor_text: String = anchor.text().collect();
            if let Some(caps) = ALLEGATO_NUMBER_PATTERN.captures(&anchor_text) {
                state.current_attachment = Some(caps[1].to_string());
            }
        }

        let is_small = classes.contains(&"box_allegati_small");
        let is_plain = classes.contains(&"box_allegati") && !is_small;

        if is_small || (is_plain && state.in_allegati_section) {
            state.annex_counter += 1;
            let label = li
                .select(&span_selector)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_else(|| state.annex_counter.to_string());
            state.current_attachment = Some(state.annex_counter.to_string());
            if with_metadata {
                annexes.entry(state.annex_counter.to_string()).or_insert_with(|| AnnexMetadata {
                    label,
                    article_count: 0,
                    article_numbers: Vec::new(),
                });
            }
            continue;
        }

        if classes.contains(&"singolo_risultato_collapse") {
            if include_headers {
                entries.push(TreeEntry::SectionHeader { text: text.trim().to_string() });
            }
            continue;
        }

        if let Some(anchor) = li.select(&article_selector).next() {
            let raw: String = anchor.text().collect();
            if let Some(numero) = normalize_article_number(&raw) {
                let allegato: Option<u32> = state.current_attachment.as_deref().and_then(|a| a.parse().ok());
                let url = Some(splice_article_url(base_urn, state.current_attachment.as_deref(), &numero));

                if with_metadata {
                    let key = state.current_attachment.clone().unwrap_or_else(|| "Dispositivo".to_string());
                    let meta = annexes.entry(key).or_insert_with(|| AnnexMetadata {
                        label: state
                            .current_attachment
                            .clone()
                            .map(|a| format!("Allegato {a}"))
                            .unwrap_or_else(|| "Dispositivo".to_string()),
                        article_count: 0,
                        article_numbers: Vec::new(),
                    });
                    meta.article_count += 1;
                    meta.article_numbers.push(numero.clone());
                }

                entries.push(TreeEntry::Article { numero, allegato, url });
            }
        }
    }

    let count = entries.len();
    TreeResult {
        entries,
        count,
        metadata: if with_metadata { Some(TreeMetadata { annexes }) } else { None },
    }
}

fn normalize_article_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("art. ").or_else(|| trimmed.strip_prefix("Art. ")).unwrap_or(trimmed);
    let stripped = stripped.strip_suffix('.').unwrap_or(stripped).trim();
    if stripped.is_empty() {
        return None;
    }
    let first = stripped.chars().next().unwrap();
    if first.is_ascii_digit() || first.is_ascii_alphabetic() {
        Some(stripped.to_string())
    } else {
        None
    }
}

fn splice_article_url(base_urn: &str, attachment: Option<&str>, article: &str) -> String {
    let split_at = base_urn
        .find(['~', '@', '!'])
        .unwrap_or(base_urn.len());
    let (head, tail) = base_urn.split_at(split_at);
    let annex_part = attachment.map(|a| format!(":{a}")).unwrap_or_default();
    format!("{head}{annex_part}~art{article}{tail}")
}

/// EUR-Lex path (spec §4.10): class-based structural scan, with a
/// text-pattern fallback when no structural classes are present.
pub fn extract_eurlex_tree(html: &str, base_url: &str, kind: &str, year: &str, num: &str) -> TreeResult {
    let document = Html::parse_document(html);
    let structural_selector = Selector::parse("[class*='ti-section'], [class*='ti-art']").unwrap();
    let mut elements: Vec<ElementRef> = document.select(&structural_selector).collect();

    if elements.is_empty() {
        return fallback_text_scan(&document, base_url);
    }

    elements.sort_by_key(|el| el.id());
    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for el in elements {
        let class = el.value().attr("class").unwrap_or("");
        let text: String = el.text().collect::<Vec<_>>().join(" ").trim().to_string();

        if class.contains("ti-section") {
            entries.push(TreeEntry::SectionHeader { text });
            continue;
        }

        if let Some(caps) = EURLEX_HEADER_PATTERN.captures(&text) {
            let numero = caps[2].to_string();
            if !seen.insert(numero.clone()) {
                continue;
            }
            let url = Some(format!("https://eur-lex.europa.eu/eli/{kind}/{year}/{num}/art_{numero}/oj"));
            entries.push(TreeEntry::Article { numero, allegato: None, url });
        }
    }

    let count = entries.len();
    TreeResult { entries, count, metadata: None }
}

fn fallback_text_scan(document: &Html, base_url: &str) -> TreeResult {
    let tag_selector = Selector::parse("p, div, span, h1, h2, h3, h4, h5, h6").unwrap();
    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for el in document.select(&tag_selector) {
        let text: String = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
        if let Some(caps) = EURLEX_HEADER_PATTERN.captures(&text) {
            let numero = caps[2].to_string();
            if !seen.insert(numero.clone()) {
                continue;
            }
            entries.push(TreeEntry::Article {
                numero: numero.clone(),
                allegato: None,
                url: Some(format!("{base_url}#art_{numero}")),
            });
        }
    }

    let count = entries.len();
    TreeResult { entries, count, metadata: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispositivo_articles_have_no_allegato() {
        let html = r#"
            <html><body><div id="albero">
                <ul>
                    <li><a class="numero_articolo">art. 1</a></li>
                    <li><a class="numero_articolo">art. 2</a></li>
                </ul>
            </div></body></html>
        "#;
        let result = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241", false, false);
        assert_eq!(result.count, 2);
        if let TreeEntry::Article { allegato, numero, .. } = &result.entries[0] {
            assert!(allegato.is_none());
            assert_eq!(numero, "1");
        } else {
            panic!("expected article entry");
        }
    }

    #[test]
    fn box_allegati_small_always_starts_new_attachment() {
        let html = r#"
            <html><body><div id="albero">
                <ul>
                    <li class="box_allegati_small"><span>Allegato A</span></li>
                    <li><a class="numero_articolo">art. 1</a></li>
                </ul>
            </div></body></html>
        "#;
        let result = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241", false, true);
        if let TreeEntry::Article { allegato, url, .. } = &result.entries[0] {
            assert_eq!(*allegato, Some(1));
            assert!(url.as_ref().unwrap().contains(":1~art1"));
        } else {
            panic!("expected article entry");
        }
        let meta = result.metadata.unwrap();
        assert!(meta.annexes.contains_key("1"));
    }

    #[test]
    fn box_allegati_only_starts_attachment_inside_allegati_section() {
        let html = r#"
            <html><body><div id="albero">
                <ul>
                    <li class="box_allegati"><span>Allegato B</span></li>
                    <li><a class="numero_articolo">art. 1</a></li>
                </ul>
            </div></body></html>
        "#;
        let result = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241", false, false);
        if let TreeEntry::Article { allegato, .. } = &result.entries[0] {
            assert!(allegato.is_none());
        } else {
            panic!("expected article entry");
        }
    }

    #[test]
    fn section_header_emitted_only_when_requested() {
        let html = r#"
            <html><body><div id="albero">
                <ul>
                    <li class="singolo_risultato_collapse">Capo I</li>
                    <li><a class="numero_articolo">art. 1</a></li>
                </ul>
            </div></body></html>
        "#;
        let without = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241", false, false);
        assert_eq!(without.count, 1);
        let with = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241", true, false);
        assert_eq!(with.count, 2);
    }

    #[test]
    fn article_url_splices_before_version_suffix() {
        let html = r#"
            <html><body><div id="albero">
                <ul><li><a class="numero_articolo">art. 5</a></li></ul>
            </div></body></html>
        "#;
        let result = extract_normattiva_tree(html, "urn:nir:stato:legge:1990-08-07;241@originale", false, false);
        if let TreeEntry::Article { url, .. } = &result.entries[0] {
            assert_eq!(url.as_deref().unwrap(), "urn:nir:stato:legge:1990-08-07;241~art5@originale");
        } else {
            panic!("expected article entry");
        }
    }

    #[test]
    fn eurlex_structural_scan_dedupes_articles() {
        let html = r#"
            <html><body>
                <div class="ti-section-1">TITOLO I</div>
                <p class="ti-art-1">Articolo 1</p>
                <p class="ti-art-1">Articolo 1</p>
                <p class="ti-art-1">Articolo 2</p>
            </body></html>
        "#;
        let result = extract_eurlex_tree(html, "https://eur-lex.europa.eu/x", "reg", "2016", "679");
        let article_count = result
            .entries
            .iter()
            .filter(|e| matches!(e, TreeEntry::Article { .. }))
            .count();
        assert_eq!(article_count, 2);
    }

    #[test]
    fn eurlex_falls_back_to_text_scan_without_structural_classes() {
        let html = r#"<html><body><p>Articolo 3</p></body></html>"#;
        let result = extract_eurlex_tree(html, "https://eur-lex.europa.eu/x", "reg", "2016", "679");
        assert_eq!(result.count, 1);
    }
}
