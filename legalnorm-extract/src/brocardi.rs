//! Brocardi resolver + extractor (C8, spec §4.8).
//!
//! Brocardi supplies supplementary commentary; coverage is incomplete,
//! so a miss is `EnrichmentOutcome::Empty`, never an error (spec §9 open
//! question, resolved: surface "no enrichment available" rather than
//! fail). Every sub-section extraction is independent: one failing does
//! not prevent the others from populating the record (spec §4.8).

use legalnorm_cache::Cache;
use legalnorm_core::{
    ArticleLink, CrossReference, EnrichmentOutcome, EnrichmentRecord, Footnote, HistoricalRelation, LegalNormResult,
    Massima, RelatedArticles,
};
use legalnorm_fetch::Fetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const SOURCE_TAG: &str = "brocardi";
const PROBE_BATCH_SIZE: usize = 3;
const PROBE_CAP: usize = 10;
const PROBE_TIMEOUT_SECS: u64 = 30;
const BATCH_PAUSE_MS: u64 = 500;

static MASSIMA_AUTHORITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(Corte Costituzionale|Corte di Cassazione(?:,\s*sez\.\s*\w+)?|Consiglio di Stato|T\.?A\.?R\.?\s*\w*|Corte dei Conti|Corte d'Appello|Tribunale|Corte di Giustizia dell'Unione Europea|Corte Europea dei Diritti dell'Uomo)\s*,?\s*n\.\s*(\d+)\s*/\s*(\d{4})",
    )
    .unwrap()
});
static MASSIMA_FALLBACK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"n\.\s*(\d+)\s*/\s*(\d{4})").unwrap());
static ARTICLE_HREF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="([^"]*art(\d+)\.html)""#).unwrap());

/// Static knowledge-base mapping human labels (act type + date + number)
/// to Brocardi section URLs. The coverage of this map is deliberately
/// small — it grows as acts are encountered — and a miss falls through
/// to `EnrichmentOutcome::Empty` rather than an error.
static KNOWLEDGE_BASE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("codice civile", "https://www.brocardi.it/codice-civile/"),
        ("codice penale", "https://www.brocardi.it/codice-penale/"),
        ("costituzione", "https://www.brocardi.it/costituzione/"),
        (
            "codice di procedura civile",
            "https://www.brocardi.it/codice-di-procedura-civile/",
        ),
        (
            "codice di procedura penale",
            "https://www.brocardi.it/codice-di-procedura-penale/",
        ),
    ]
    .into_iter()
    .collect()
});

/// Matches a normalized act type + number against the knowledge base
/// (spec §4.8: exact substring, act-type+number, act-type-only for
/// single-instance codes like the constitution).
pub fn lookup_section_url(act_type: &str, label: &str) -> Option<&'static str> {
    let lower_label = label.to_lowercase();
    if let Some((_, url)) = KNOWLEDGE_BASE.iter().find(|(k, _)| lower_label.contains(*k)) {
        return Some(*url);
    }
    if let Some(url) = KNOWLEDGE_BASE.get(act_type) {
        return Some(url);
    }
    if act_type == "costituzione" {
        return KNOWLEDGE_BASE.get("costituzione").copied();
    }
    None
}

pub struct BrocardiResolver {
    fetcher: Arc<Fetcher>,
    cache: Arc<dyn Cache>,
}

impl BrocardiResolver {
    pub fn new(fetcher: Arc<Fetcher>, cache: Arc<dyn Cache>) -> Self {
        Self { fetcher, cache }
    }

    /// Fetches and caches a page, returning its HTML.
    async fn fetch_cached(&self, url: &str) -> LegalNormResult<String> {
        if let Some(cached) = self.cache.get(SOURCE_TAG, url).await {
            if let Some(text) = cached.as_str() {
                return Ok(text.to_string());
            }
        }
        let response = self.fetcher.fetch(url, SOURCE_TAG).await?;
        self.cache.set(SOURCE_TAG, url, serde_json::json!(response.text)).await;
        Ok(response.text)
    }

    /// Article discovery (spec §4.8 steps 1-5).
    pub async fn discover_article_url(&self, section_url: &str, article_number: &str) -> Option<String> {
        let html = self.fetch_cached(section_url).await.ok()?;

        let pattern = format!(r#"href="([^"]*art{article_number}\.html)""#);
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(caps) = re.captures(&html) {
                return Some(resolve_relative(section_url, &caps[1]));
            }
        }

        let document = Html::parse_document(&html);
        let section_selector = Selector::parse("div.section-title").unwrap();
        let anchor_selector = Selector::parse("a").unwrap();
        let mut candidates: Vec<String> = Vec::new();
        for section in document.select(&section_selector) {
            for anchor in section.select(&anchor_selector) {
                if let Some(href) = anchor.value().attr("href") {
                    candidates.push(resolve_relative(section_url, href));
                    if candidates.len() >= PROBE_CAP {
                        break;
                    }
                }
            }
            if candidates.len() >= PROBE_CAP {
                break;
            }
        }

        for batch in candidates.chunks(PROBE_BATCH_SIZE) {
            let found = self.probe_batch(batch, article_number).await;
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
        }

        None
    }

    async fn probe_batch(&self, urls: &[String], article_number: &str) -> Option<String> {
        let futures: Vec<_> = urls
            .iter()
            .map(|url| {
                let resolver = self;
                let url = url.clone();
                async move {
                    let text = timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), resolver.fetch_cached(&url))
                        .await
                        .ok()?
                        .ok()?;
                    if contains_article_anchor(&text, article_number) {
                        Some(url)
                    } else {
                        None
                    }
                }
            })
            .collect();
        let results = futures::future::join_all(futures).await;
        results.into_iter().flatten().next()
    }

    /// Extracts an article page (spec §4.8). Returns `Empty` when the
    /// page cannot be found at all; otherwise every sub-section is
    /// attempted independently.
    pub async fn extract_article_page(&self, article_url: &str, is_civil_code: bool) -> EnrichmentOutcome {
        let Ok(html) = self.fetch_cached(article_url).await else {
            return EnrichmentOutcome::Empty;
        };
        let document = Html::parse_document(&html);

        let container_selector =
            Selector::parse("div.panes-condensed.panes-w-ads.content-ext-guide.content-mark").unwrap();
        let Some(container) = document.select(&container_selector).next() else {
            return EnrichmentOutcome::Empty;
        };

        let record = EnrichmentRecord {
            position: extract_position(&document),
            brocardi_url: Some(article_url.to_string()),
            brocardi_maxims: extract_maxims(&container),
            ratio: extract_ratio(&container),
            explanation: extract_explanation(&container),
            glossary_entries: Vec::new(),
            historical_relations: extract_relazioni(&container, is_civil_code),
            footnotes: extract_footnotes(&container),
            related_articles: extract_related_articles(&container),
            cross_references: extract_cross_references(&container),
        };

        EnrichmentOutcome::Found(record)
    }
}

fn resolve_relative(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if let Some(root_end) = base.find("://").map(|i| i + 3).and_then(|i| base[i..].find('/').map(|j| i + j)) {
        format!("{}{}", &base[..root_end], if href.starts_with('/') { href.to_string() } else { format!("/{href}") })
    } else {
        format!("{base}{href}")
    }
}

fn contains_article_anchor(html: &str, article_number: &str) -> bool {
    let pattern = format!("art{article_number}.html");
    html.contains(&pattern)
}

fn extract_position(document: &Html) -> Option<String> {
    let selector = Selector::parse("div#breadcrumb").ok()?;
    let el = document.select(&selector).next()?;
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    Some(text.trim().trim_start_matches("Brocardi.it").trim().to_string())
}

fn extract_maxims(container: &ElementRef) -> Vec<Massima> {
    let heading_present = container
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .contains("Massime relative all'art");
    if !heading_present {
        return Vec::new();
    }
    let Ok(selector) = Selector::parse("div.sentenza") else { return Vec::new() };
    let strong_selector = Selector::parse("strong").ok();

    container
        .select(&selector)
        .map(|el| {
            let full_text: String = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
            let strong_text = strong_selector
                .as_ref()
                .and_then(|s| el.select(s).next())
                .map(|s| s.text().collect::<String>())
                .unwrap_or_default();

            if let Some(caps) = MASSIMA_AUTHORITY_PATTERN.captures(&strong_text) {
                let authority = caps[1].trim().to_string();
                let number = caps[2].to_string();
                let year = caps[3].to_string();
                let text = full_text.replacen(&strong_text, "", 1).trim().to_string();
                return Massima { authority, number, year, text };
            }

            if let Some(caps) = MASSIMA_FALLBACK_PATTERN.captures(&full_text) {
                let number = caps[1].to_string();
                let year = caps[2].to_string();
                let authority = full_text.split("n.").next().unwrap_or("").trim().to_string();
                return Massima { authority, number, year, text: full_text };
            }

            Massima {
                authority: String::new(),
                number: String::new(),
                year: String::new(),
                text: full_text,
            }
        })
        .collect()
}

fn extract_ratio(container: &ElementRef) -> Option<String> {
    let ratio_selector = Selector::parse("div.container-ratio > div.corpoDelTesto").ok()?;
    container.select(&ratio_selector).next().map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
}

fn extract_explanation(container: &ElementRef) -> Option<String> {
    let heading_selector = Selector::parse("h3").ok()?;
    let text_selector = Selector::parse("div.text").ok()?;
    let heading = container
        .select(&heading_selector)
        .find(|h| h.text().collect::<String>().contains("Spiegazione dell'art"))?;
    heading
        .next_siblings()
        .filter_map(scraper::ElementRef::wrap)
        .find(|el| text_selector.matches(el))
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
}

fn extract_relazioni(container: &ElementRef, is_civil_code: bool) -> Vec<HistoricalRelation> {
    let mut relations = Vec::new();
    if let Some(rel) = extract_relazione_costituzione(container) {
        relations.push(rel);
    }
    if is_civil_code {
        relations.extend(extract_guardasigilli(container, "Libro delle Obbligazioni"));
        relations.extend(extract_guardasigilli(container, "Codice Civile"));
    }
    relations
}

fn extract_relazione_costituzione(container: &ElementRef) -> Option<HistoricalRelation> {
    let heading_selector = Selector::parse("h3").ok()?;
    let heading = container.select(&heading_selector).find(|h| {
        h.text().collect::<String>().contains("Relazione al Progetto della Costituzione")
    })?;
    let text = heading
        .next_sibling()
        .and_then(scraper::ElementRef::wrap)
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default();
    Some(HistoricalRelation {
        kind: "RelazioneCostituzione".to_string(),
        title: "Relazione al Progetto della Costituzione".to_string(),
        paragraph: None,
        text,
        cited_articles: extract_cited_articles(&text),
    })
}

fn extract_guardasigilli(container: &ElementRef, heading_text: &str) -> Vec<HistoricalRelation> {
    let Ok(heading_selector) = Selector::parse("h3") else { return Vec::new() };
    container
        .select(&heading_selector)
        .filter(|h| {
            let t = h.text().collect::<String>();
            t.contains(heading_text) && t.contains("Relazione")
        })
        .filter_map(|heading| {
            let body = heading.next_sibling().and_then(scraper::ElementRef::wrap)?;
            let text = body.text().collect::<Vec<_>>().join(" ").trim().to_string();
            Some(HistoricalRelation {
                kind: "Guardasigilli".to_string(),
                title: heading.text().collect::<String>().trim().to_string(),
                paragraph: None,
                text: text.clone(),
                cited_articles: extract_cited_articles(&text),
            })
        })
        .collect()
}

fn extract_cited_articles(text: &str) -> Vec<String> {
    ARTICLE_HREF_PATTERN.captures_iter(text).map(|c| c[2].to_string()).collect()
}

fn extract_footnotes(container: &ElementRef) -> Vec<Footnote> {
    let mut notes: HashMap<String, Footnote> = HashMap::new();

    if let Ok(selector) = Selector::parse("a.nota-ref") {
        for anchor in container.select(&selector) {
            let number: String = anchor.text().collect::<String>().trim().to_string();
            if let Some(href) = anchor.value().attr("href") {
                if let Some(target_id) = href.strip_prefix('#') {
                    if let Ok(target_selector) = Selector::parse(&format!("#{target_id}")) {
                        if let Some(target) = container.select(&target_selector).next() {
                            let text = target.text().collect::<Vec<_>>().join(" ").trim().to_string();
                            notes.entry(number.clone()).or_insert(Footnote {
                                number: number.clone(),
                                text,
                                kind: "nota-ref".to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("div.corpoDelTesto.nota") {
        for (i, el) in container.select(&selector).enumerate() {
            let number = (i + 1).to_string();
            notes.entry(number.clone()).or_insert(Footnote {
                number,
                text: el.text().collect::<Vec<_>>().join(" ").trim().to_string(),
                kind: "corpoDelTesto-nota".to_string(),
            });
        }
    }

    if let Ok(sup_selector) = Selector::parse("sup") {
        for sup in container.select(&sup_selector) {
            let number: String = sup.text().collect::<String>().trim().to_string();
            if number.chars().all(|c| c.is_ascii_digit()) && !number.is_empty() {
                if let Some(sibling) = sup
                    .next_siblings()
                    .filter_map(scraper::ElementRef::wrap)
                    .find(|el| el.value().attr("class").unwrap_or("").contains("nota"))
                {
                    notes.entry(number.clone()).or_insert(Footnote {
                        number,
                        text: sibling.text().collect::<Vec<_>>().join(" ").trim().to_string(),
                        kind: "legacy-sup".to_string(),
                    });
                }
            }
        }
    }

    if let Ok(anchor_selector) = Selector::parse("a") {
        for anchor in container.select(&anchor_selector) {
            let href = anchor.value().attr("href").unwrap_or("");
            if let Some(target) = href.strip_prefix("#nota") {
                let number = target.to_string();
                if let Ok(target_selector) = Selector::parse(&format!("#nota{number}")) {
                    if let Some(el) = container.select(&target_selector).next() {
                        notes.entry(number.clone()).or_insert(Footnote {
                            number,
                            text: el.text().collect::<Vec<_>>().join(" ").trim().to_string(),
                            kind: "legacy-anchor".to_string(),
                        });
                    }
                }
            }
        }
    }

    let mut result: Vec<Footnote> = notes.into_values().collect();
    result.sort_by(|a, b| a.number.parse::<u32>().unwrap_or(0).cmp(&b.number.parse::<u32>().unwrap_or(0)));
    result
}

fn extract_related_articles(container: &ElementRef) -> RelatedArticles {
    let Ok(anchor_selector) = Selector::parse("a") else { return RelatedArticles::default() };
    let mut previous = None;
    let mut next = None;

    for anchor in container.select(&anchor_selector) {
        let text = anchor.text().collect::<String>().to_lowercase();
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(caps) = ARTICLE_HREF_PATTERN.captures(&format!("href=\"{href}\"")) else { continue };
        let number = caps[2].to_string();
        let link = ArticleLink { number, url: href.to_string(), title: None };
        if text.contains("precedente") {
            previous = Some(link);
        } else if text.contains("successivo") {
            next = Some(link);
        }
    }

    RelatedArticles { previous, next }
}

fn extract_cross_references(container: &ElementRef) -> Vec<CrossReference> {
    let Ok(anchor_selector) = Selector::parse("a") else { return Vec::new() };
    let mut seen = std::collections::HashSet::new();
    let mut refs = Vec::new();

    for anchor in container.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(caps) = ARTICLE_HREF_PATTERN.captures(&format!("href=\"{href}\"")) else { continue };
        if !seen.insert(href.to_string()) {
            continue;
        }
        let article = caps[2].to_string();
        let act_type = classify_act_prefix(href);
        refs.push(CrossReference { article, act_type, url: href.to_string(), section: "brocardi".to_string() });
    }

    refs
}

fn classify_act_prefix(href: &str) -> String {
    if href.contains("/codice-civile/") {
        "codice civile".to_string()
    } else if href.contains("/codice-penale/") {
        "codice penale".to_string()
    } else if href.contains("/costituzione/") {
        "costituzione".to_string()
    } else {
        "sconosciuto".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_base_matches_by_substring() {
        assert!(lookup_section_url("codice civile", "Codice Civile art. 1414").is_some());
    }

    #[test]
    fn knowledge_base_falls_back_to_act_type_only() {
        assert_eq!(
            lookup_section_url("costituzione", "riferimento ignoto"),
            Some("https://www.brocardi.it/costituzione/")
        );
    }

    #[test]
    fn knowledge_base_miss_returns_none() {
        assert!(lookup_section_url("legge regionale", "qualcosa").is_none());
    }

    #[test]
    fn extracts_maxim_with_authority_match() {
        let html = r#"
            <html><body><div class="panes-condensed panes-w-ads content-ext-guide content-mark">
                Massime relative all'art
                <div class="sentenza"><strong>Corte di Cassazione, sez. II, </strong> n. 123/2019. La massima qui.</div>
            </div></body></html>
        "#;
        let document = Html::parse_document(html);
        let container_selector =
            Selector::parse("div.panes-condensed.panes-w-ads.content-ext-guide.content-mark").unwrap();
        let container = document.select(&container_selector).next().unwrap();
        let maxims = extract_maxims(&container);
        assert_eq!(maxims.len(), 1);
        assert_eq!(maxims[0].number, "123");
        assert_eq!(maxims[0].year, "2019");
    }

    #[test]
    fn extracts_position_stripping_brocardi_prefix() {
        let html = r#"<html><body><div id="breadcrumb">Brocardi.it &gt; Codice Civile &gt; Art. 1414</div></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(extract_position(&document).unwrap(), "&gt; Codice Civile &gt; Art. 1414");
    }

    #[test]
    fn footnotes_are_deduplicated_and_sorted() {
        let html = r#"
            <html><body><div class="panes-condensed panes-w-ads content-ext-guide content-mark">
                <div class="corpoDelTesto nota">Seconda nota</div>
                <div class="corpoDelTesto nota">Prima nota duplicata logic</div>
            </div></body></html>
        "#;
        let document = Html::parse_document(html);
        let container_selector =
            Selector::parse("div.panes-condensed.panes-w-ads.content-ext-guide.content-mark").unwrap();
        let container = document.select(&container_selector).next().unwrap();
        let notes = extract_footnotes(&container);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].number, "1");
        assert_eq!(notes[1].number, "2");
    }
}
