//! Date resolver (C5, spec §4.5).
//!
//! Drives a `HeadlessBrowser` session against Normattiva's search to
//! complete a year-only date, caching the result by
//! `(act_type, year, act_number)`. Failure never propagates as an error:
//! it collapses to `None`, which `legalnorm_core::urn::UrnBuilder`
//! interprets as "use `YYYY-01-01`" (spec §4.2 step 4, §8).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use legalnorm_cache::Cache;
use legalnorm_core::act_type::normalize_for_search;
use legalnorm_core::DateResolver as CoreDateResolver;

use crate::headless::HeadlessBrowser;

const HOMEPAGE: &str = "https://www.normattiva.it/";

/// Selectors tried in order for the first search-result link (spec §4.5
/// step 5: "the upstream has rotated selectors over time").
const RESULT_SELECTORS: &[&str] = &[
    "a.risultato-link",
    "div.risultati-ricerca a",
    "table.risultati a:first-child",
    "a[href*='uri-res']",
];

static ITALIAN_MONTHS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("gennaio", "01"), ("febbraio", "02"), ("marzo", "03"), ("aprile", "04"),
        ("maggio", "05"), ("giugno", "06"), ("luglio", "07"), ("agosto", "08"),
        ("settembre", "09"), ("ottobre", "10"), ("novembre", "11"), ("dicembre", "12"),
    ]
    .into_iter()
    .collect()
});

static ITALIAN_DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre)\s+(\d{4})\b").unwrap()
});

/// Converts an Italian long-form date (`"7 agosto 1990"`) to ISO
/// (`"1990-08-07"`).
pub fn extract_italian_date(text: &str) -> Option<String> {
    let caps = ITALIAN_DATE_PATTERN.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = ITALIAN_MONTHS.get(caps[2].to_lowercase().as_str())?;
    let year = &caps[3];
    Some(format!("{year}-{month}-{day:02}"))
}

pub struct NormattivaDateResolver {
    browser: Arc<dyn HeadlessBrowser>,
    cache: Arc<dyn Cache>,
}

impl NormattivaDateResolver {
    pub fn new(browser: Arc<dyn HeadlessBrowser>, cache: Arc<dyn Cache>) -> Self {
        Self { browser, cache }
    }

    fn cache_key(act_type: &str, year: &str, act_number: &str) -> String {
        format!("{act_type}|{year}|{act_number}")
    }
}

#[async_trait]
impl CoreDateResolver for NormattivaDateResolver {
    async fn resolve_date(&self, act_type: &str, year: &str, act_number: &str) -> Option<String> {
        let key = Self::cache_key(act_type, year, act_number);
        if let Some(cached) = self.cache.get("date-resolver", &key).await {
            return cached.as_str().map(str::to_string);
        }

        let resolved = self.resolve_uncached(act_type, year, act_number).await;
        if let Some(ref date) = resolved {
            self.cache.set("date-resolver", &key, serde_json::json!(date)).await;
        }
        resolved
    }
}

impl NormattivaDateResolver {
    async fn resolve_uncached(&self, act_type: &str, year: &str, act_number: &str) -> Option<String> {
        self.browser.navigate(HOMEPAGE).await.ok()?;
        self.browser.dismiss_consent_banner().await;

        let query = format!("{} {} {}", normalize_for_search(act_type), act_number, year);
        self.browser.fill("input[name='search']", &query).await.ok()?;
        self.browser.click("button[type='submit']").await.ok()?;

        let result_text = self
            .browser
            .first_matching_text(RESULT_SELECTORS, Duration::from_secs(10))
            .await?;

        extract_italian_date(&result_text)
    }
}
