//! Amendment history extractor (C9, spec §4.9 — "a sub-component of C6").
//!
//! Parses Normattiva's `vediAggiornamentiAllAtto` table. Progressive-
//! numbered rows open a new modifying-act context; detail rows that
//! contain "ha disposto" are parsed with a fixed regex family. Anything
//! the regexes can't resolve is handed to an injectable LLM fallback
//! (spec §4.9, §9 — no concrete LLM client ships in this workspace, so
//! the seam is a trait with a no-op default, mirroring `HeadlessBrowser`).

use async_trait::async_trait;
use legalnorm_core::{
    ActReference, AmendmentKind, AmendmentRecord, LegalNormResult, NoDateResolver, UrnBuilder,
    VersionKind,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static ACT_INFO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:la|il|lo)\s+([a-z\s\-]+?)\s+(\d{1,2}\s+\w+\s+\d{4}),?\s+n\.\s*(\d+)").unwrap()
});
static TIPO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(la modifica|l'abrogazione|l'introduzione|la sostituzione)").unwrap());
static ART_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)dell'art\.\s*(\d+(?:-\w+)?)").unwrap());
static COMMA_AFTER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)dell'art\.\s*\d+(?:-\w+)?\s*,\s*comma\s*(\d+(?:-\w+)?)").unwrap());
static LETTERA_AFTER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)comma\s*\d+(?:-\w+)?\s*,\s*lettera\s*(\w+)").unwrap());
static COMMA_BEFORE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)del\s+comma\s*(\d+(?:-\w+)?)\s+dell'art").unwrap());
static LETTERA_BEFORE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)della\s+lettera\s*(\w+)\s+del\s+comma").unwrap());
static DISPOSIZIONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(con l'art\.\s*([^)]+)\)").unwrap());
static BASE_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)").unwrap());

#[derive(Debug, Clone, Default)]
struct ActInfo {
    estremi: String,
    urn: Option<String>,
}

/// Destination of a failed regex parse (`{articolo, comma, lettera, numero}`).
#[derive(Debug, Clone, Default)]
pub struct LlmDestination {
    pub articolo: Option<String>,
    pub comma: Option<String>,
    pub lettera: Option<String>,
    pub numero: Option<String>,
}

/// LLM fallback seam for destination parsing (spec §4.9). No concrete
/// backend ships here; `NullDestinationParser` always returns `None`
/// for every entry, leaving those amendments dropped rather than
/// fabricated.
#[async_trait]
pub trait DestinationParser: Send + Sync {
    async fn parse_batch(&self, contents: &[String]) -> Vec<Option<LlmDestination>>;
}

pub struct NullDestinationParser;

#[async_trait]
impl DestinationParser for NullDestinationParser {
    async fn parse_batch(&self, contents: &[String]) -> Vec<Option<LlmDestination>> {
        vec![None; contents.len()]
    }
}

struct FailedEntry {
    content: String,
    act_info: Option<ActInfo>,
    date: Option<String>,
    kind: AmendmentKind,
}

/// Parses the amendments table and resolves regex failures through
/// `parser` (spec §4.9 steps 3-4). `target_article` is `None` to skip
/// article filtering entirely.
pub async fn extract_amendment_history(
    html: &str,
    target_article: Option<&str>,
    parser: &dyn DestinationParser,
) -> LegalNormResult<Vec<AmendmentRecord>> {
    let (mut records, failed) = parse_table(html, target_article).await?;

    if !failed.is_empty() {
        let contents: Vec<String> = failed.iter().map(|f| f.content.clone()).collect();
        let results = parser.parse_batch(&contents).await;
        for (entry, llm) in failed.into_iter().zip(results.into_iter()) {
            let Some(dest) = llm else { continue };
            let Some(articolo) = dest.articolo.clone() else { continue };

            if let Some(target) = target_article {
                if !article_matches(target, &articolo) {
                    continue;
                }
            }

            let destination = format_destination(&articolo, dest.comma.as_deref(), dest.lettera.as_deref());
            records.push(AmendmentRecord {
                kind: entry.kind,
                modifying_act_urn: entry.act_info.as_ref().and_then(|a| a.urn.clone()).unwrap_or_default(),
                modifying_act_label: entry.act_info.map(|a| a.estremi).unwrap_or_default(),
                disposition: String::new(),
                destination,
                effective_date: entry.date.clone().unwrap_or_default(),
                gazette_date: entry.date,
                note: None,
            });
        }
    }

    records.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
    Ok(records)
}

async fn parse_table(
    html: &str,
    target_article: Option<&str>,
) -> LegalNormResult<(Vec<AmendmentRecord>, Vec<FailedEntry>)> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").unwrap();
    let Some(table) = document.select(&table_selector).next() else {
        return Ok((Vec::new(), Vec::new()));
    };

    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut records = Vec::new();
    let mut failed = Vec::new();
    let mut current_act_info: Option<ActInfo> = None;
    let mut current_date: Option<String> = None;

    for row in table.select(&row_selector).skip(1) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 3 {
            continue;
        }

        let prog = cell_text(&cells[0]);
        let date_str = cell_text(&cells[1]);
        let content = cell_text(&cells[2]);

        if !prog.is_empty() {
            current_act_info = extract_act_info(&content).await;
            current_date = parse_date_ddmmyyyy(&date_str);
        }

        if !content.to_lowercase().contains("ha disposto") {
            continue;
        }

        match parse_modification_detail(&content, current_act_info.as_ref(), &current_date, target_article) {
            Some(record) => records.push(record),
            None => {
                if let Some(kind) = TIPO_PATTERN
                    .captures(&content.to_lowercase())
                    .and_then(|c| AmendmentKind::from_italian(&c[1]))
                {
                    failed.push(FailedEntry {
                        content: content.clone(),
                        act_info: current_act_info.clone(),
                        date: current_date.clone(),
                        kind,
                    });
                }
            }
        }
    }

    Ok((records, failed))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

async fn extract_act_info(text: &str) -> Option<ActInfo> {
    let caps = ACT_INFO_PATTERN.captures(text)?;
    let act_type_raw = caps[1].trim().to_string();
    let date_raw = caps[2].trim().to_string();
    let number = caps[3].trim().to_string();

    let normalized_type = legalnorm_core::normalize_act_type(&act_type_raw);
    let estremi = format!("{act_type_raw} {date_raw}, n. {number}");
    let iso_date = legalnorm_fetch::extract_italian_date(&date_raw);

    let urn = if let Some(iso_date) = iso_date {
        let reference = ActReference::new(
            normalized_type,
            Some(iso_date),
            Some(number),
            String::new(),
            None,
            VersionKind::Absent,
            None,
        );
        UrnBuilder::build(&reference, &NoDateResolver).await.ok().map(|u| u.as_str().to_string())
    } else {
        None
    };

    Some(ActInfo { estremi, urn })
}

fn parse_modification_detail(
    content: &str,
    act_info: Option<&ActInfo>,
    date: &Option<String>,
    target_article: Option<&str>,
) -> Option<AmendmentRecord> {
    act_info?;
    let lower = content.to_lowercase();

    let kind = TIPO_PATTERN.captures(&lower).and_then(|c| AmendmentKind::from_italian(&c[1]))?;
    let target = ART_PATTERN.captures(&lower)?[1].to_string();

    let mut comma = COMMA_AFTER_PATTERN.captures(&lower).map(|c| c[1].to_string());
    let mut lettera = if comma.is_some() {
        LETTERA_AFTER_PATTERN.captures(&lower).map(|c| c[1].to_string())
    } else {
        None
    };
    if comma.is_none() {
        comma = COMMA_BEFORE_PATTERN.captures(&lower).map(|c| c[1].to_string());
    }
    if lettera.is_none() {
        lettera = LETTERA_BEFORE_PATTERN.captures(&lower).map(|c| c[1].to_string());
    }

    if let Some(t) = target_article {
        if !article_matches(t, &target) {
            return None;
        }
    }

    let destination = format_destination(&target, comma.as_deref(), lettera.as_deref());
    let disposition = DISPOSIZIONE_PATTERN
        .captures(content)
        .map(|c| format!("art. {}", c[1].trim()));

    Some(AmendmentRecord {
        kind,
        modifying_act_urn: act_info.and_then(|a| a.urn.clone()).unwrap_or_default(),
        modifying_act_label: act_info.map(|a| a.estremi.clone()).unwrap_or_default(),
        disposition: disposition.unwrap_or_default(),
        destination,
        effective_date: date.clone().unwrap_or_default(),
        gazette_date: date.clone(),
        note: None,
    })
}

fn format_destination(article: &str, comma: Option<&str>, lettera: Option<&str>) -> String {
    let mut destination = format!("art. {article}");
    if let Some(c) = comma {
        destination.push_str(&format!(", comma {c}"));
    }
    if let Some(l) = lettera {
        destination.push_str(&format!(", lettera {l}"));
    }
    destination
}

/// Base-number match with exact-match required when the requested
/// article names an extension (spec §4.9 article filter).
pub fn article_matches(requested: &str, target: &str) -> bool {
    let requested = requested.to_lowercase();
    let target = target.to_lowercase();
    let (Some(req_base), Some(tgt_base)) = (
        BASE_NUMBER_PATTERN.captures(&requested).map(|c| c[1].to_string()),
        BASE_NUMBER_PATTERN.captures(&target).map(|c| c[1].to_string()),
    ) else {
        return false;
    };
    if req_base != tgt_base {
        return false;
    }
    if requested.contains('-') {
        return requested == target;
    }
    true
}

fn parse_date_ddmmyyyy(date_str: &str) -> Option<String> {
    let parts: Vec<&str> = date_str.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    Some(format!("{}-{:0>2}-{:0>2}", parts[2], parts[1], parts[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_html(rows: &str) -> String {
        format!(
            r#"<html><body><table><tr><th>h</th></tr>{rows}</table></body></html>"#
        )
    }

    #[tokio::test]
    async fn parses_simple_modification_row() {
        let html = table_html(
            r#"<tr>
                <td>1</td>
                <td>15/05/1997</td>
                <td>La LEGGE 15 maggio 1997, n. 127 ha disposto (con l'art. 2, comma 1) la modifica dell'art. 2, comma 1.</td>
            </tr>"#,
        );
        let records = extract_amendment_history(&html, None, &NullDestinationParser).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, AmendmentKind::Modifies);
        assert_eq!(records[0].destination, "art. 2, comma 1");
        assert_eq!(records[0].effective_date, "1997-05-15");
    }

    #[tokio::test]
    async fn filters_by_article_base_number() {
        let html = table_html(
            r#"<tr>
                <td>1</td>
                <td>15/05/1997</td>
                <td>La LEGGE 15 maggio 1997, n. 127 ha disposto (con l'art. 2) l'abrogazione dell'art. 5.</td>
            </tr>"#,
        );
        let records = extract_amendment_history(&html, Some("2"), &NullDestinationParser).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn extension_filter_requires_exact_match() {
        let html = table_html(
            r#"<tr>
                <td>1</td>
                <td>15/05/1997</td>
                <td>La LEGGE 15 maggio 1997, n. 127 ha disposto (con l'art. 2) la modifica dell'art. 3.</td>
            </tr>"#,
        );
        let records = extract_amendment_history(&html, Some("3-bis"), &NullDestinationParser).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn base_article_request_accepts_extension_variants() {
        let html = table_html(
            r#"<tr>
                <td>1</td>
                <td>15/05/1997</td>
                <td>La LEGGE 15 maggio 1997, n. 127 ha disposto (con l'art. 2) l'introduzione dell'art. 3-bis.</td>
            </tr>"#,
        );
        let records = extract_amendment_history(&html, Some("3"), &NullDestinationParser).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, AmendmentKind::Inserts);
    }

    #[tokio::test]
    async fn missing_table_returns_empty() {
        let html = "<html><body>no table here</body></html>";
        let records = extract_amendment_history(html, None, &NullDestinationParser).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn results_are_sorted_by_effective_date() {
        let html = table_html(
            r#"<tr>
                <td>1</td>
                <td>01/01/2000</td>
                <td>La LEGGE 1 gennaio 2000, n. 1 ha disposto (con l'art. 1) la modifica dell'art. 9.</td>
            </tr>
            <tr>
                <td>2</td>
                <td>01/01/1990</td>
                <td>La LEGGE 1 gennaio 1990, n. 2 ha disposto (con l'art. 1) la modifica dell'art. 9.</td>
            </tr>"#,
        );
        let records = extract_amendment_history(&html, None, &NullDestinationParser).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].effective_date < records[1].effective_date);
    }
}
