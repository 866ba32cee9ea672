//! Aggregator engine (C11, spec §4.11, §6).
//!
//! Ties together C2 (URN), C3 (fetch), C4 (cache) and the C6-C10
//! extractors behind the seven operations the enclosing service layer
//! calls. Each upstream-facing call goes through the shared `Fetcher`
//! so the per-tag circuit breaker and throttle apply uniformly.

use std::sync::Arc;

use legalnorm_cache::Cache;
use legalnorm_core::{
    ActReference, AmendmentRecord, CanonicalUrn, DateResolver, EnrichmentOutcome, LegalNormError, LegalNormResult,
    NoDateResolver, ResolvedArticleText, TreeResult, UrnBuilder,
};
use legalnorm_extract::{
    amendments, brocardi::lookup_section_url, normattiva, tree, BrocardiResolver, DestinationParser, EurLexExtractor,
    NullDestinationParser,
};
use legalnorm_fetch::{Fetcher, HeadlessBrowser, NullBrowser};
use once_cell::sync::Lazy;
use regex::Regex;

const NORMATTIVA_TAG: &str = "normattiva";

static AGGIORNAMENTI_BUTTON_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"id="aggiornamenti_atto_button"[^>]*data-href="([^"]+)""#).unwrap()
});
static ELI_URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/eli/(\w+)/(\d{4})/(\w+)/oj").unwrap());
static SESSION_EXPIRED_MARKER: &str = "Sessione Scaduta";

/// Wires together every dependency the seven external operations need.
/// Constructed once per process; cheap to clone via `Arc` fields.
pub struct Engine {
    fetcher: Arc<Fetcher>,
    cache: Arc<dyn Cache>,
    date_resolver: Arc<dyn DateResolver>,
    browser: Arc<dyn HeadlessBrowser>,
    destination_parser: Arc<dyn DestinationParser>,
    brocardi: BrocardiResolver,
    eurlex: EurLexExtractor,
}

impl Engine {
    pub fn new(fetcher: Arc<Fetcher>, cache: Arc<dyn Cache>) -> Self {
        let browser: Arc<dyn HeadlessBrowser> = Arc::new(NullBrowser);
        Self {
            brocardi: BrocardiResolver::new(fetcher.clone(), cache.clone()),
            eurlex: EurLexExtractor::new(browser.clone()),
            fetcher,
            cache,
            date_resolver: Arc::new(NoDateResolver),
            browser,
            destination_parser: Arc::new(NullDestinationParser),
        }
    }

    /// Injects a real headless-browser backend and LLM destination
    /// parser in place of the no-op defaults.
    pub fn with_backends(
        mut self,
        browser: Arc<dyn HeadlessBrowser>,
        date_resolver: Arc<dyn DateResolver>,
        destination_parser: Arc<dyn DestinationParser>,
    ) -> Self {
        self.eurlex = EurLexExtractor::new(browser.clone());
        self.browser = browser;
        self.date_resolver = date_resolver;
        self.destination_parser = destination_parser;
        self
    }

    /// `ResolveReference` (spec §6).
    pub async fn resolve_reference(&self, reference: &ActReference) -> LegalNormResult<CanonicalUrn> {
        UrnBuilder::build(reference, self.date_resolver.as_ref()).await
    }

    /// `ResolveReference`. The codes default-annex quirk (spec §4.2 edge
    /// cases, §9) is already handled by `UrnBuilder::build` itself (step
    /// 5 falls back to the stripped default whenever the caller supplies
    /// none), so the service layer only needs to forward the call; kept
    /// as its own method so callers read the policy at the call site.
    pub async fn resolve_reference_with_default_annex(&self, reference: &ActReference) -> LegalNormResult<CanonicalUrn> {
        self.resolve_reference(reference).await
    }

    /// `FetchArticleText` (spec §6). `eu_article_number` supplies the
    /// article number for EU acts, whose canonical URL carries no
    /// article marker (unlike the NIR URN's `~artN` suffix).
    pub async fn fetch_article_text(
        &self,
        urn: &CanonicalUrn,
        eu_article_number: Option<&str>,
    ) -> LegalNormResult<ResolvedArticleText> {
        match urn {
            CanonicalUrn::EuUrl(url) => {
                let article_number = eu_article_number
                    .ok_or_else(|| LegalNormError::validation("article", "article number required for EU acts"))?;
                let text = self.eurlex.fetch_article(url, article_number).await?;
                Ok(ResolvedArticleText {
                    text,
                    urn: urn.clone(),
                    link_map: None,
                    source: legalnorm_core::SourceTag::EurLex,
                })
            }
            CanonicalUrn::Nir(nir) => {
                let html = self.fetch_normattiva_html(nir).await?;
                normattiva::extract_article(&html, urn, false)
            }
        }
    }

    /// `FetchTree` (spec §4.10, §6).
    pub async fn fetch_tree(
        &self,
        urn: &CanonicalUrn,
        with_links: bool,
        with_details: bool,
        with_metadata: bool,
    ) -> LegalNormResult<TreeResult> {
        let cache_key = format!("{}|{with_links}|{with_details}|{with_metadata}", urn.as_str());
        if let Some(cached) = self.cache.get("tree", &cache_key).await {
            if let Ok(tree) = serde_json::from_value::<TreeResult>(cached) {
                return Ok(tree);
            }
        }

        let result = match urn {
            CanonicalUrn::Nir(nir) => {
                let html = self.fetch_normattiva_html(nir).await?;
                tree::extract_normattiva_tree(&html, nir, with_details, with_metadata)
            }
            CanonicalUrn::EuUrl(url) => {
                let html = self.browser.rendered_html(url).await?;
                let (kind, year, num) = parse_eli_url(url)
                    .ok_or_else(|| LegalNormError::parsing("eur-lex tree: unrecognized ELI url", url))?;
                let _ = with_links;
                tree::extract_eurlex_tree(&html, url, &kind, &year, &num)
            }
        };

        if let Ok(value) = serde_json::to_value(&result) {
            self.cache.set("tree", &cache_key, value).await;
        }
        Ok(result)
    }

    /// `FetchEnrichment` (spec §4.8, §6). Returns `Empty` rather than an
    /// error when the act has no Brocardi coverage.
    pub async fn fetch_enrichment(&self, reference: &ActReference) -> LegalNormResult<EnrichmentOutcome> {
        let normalized = legalnorm_core::normalize_act_type(&reference.act_type);
        let label = format!(
            "{} {} {}",
            reference.act_type,
            reference.date.clone().unwrap_or_default(),
            reference.act_number.clone().unwrap_or_default()
        );
        let Some(section_url) = lookup_section_url(&normalized, &label) else {
            return Ok(EnrichmentOutcome::Empty);
        };

        let article = if reference.article.trim().is_empty() { "1" } else { reference.article.trim() };
        let base_number: String = article.chars().take_while(|c| c.is_ascii_digit()).collect();
        let Some(article_url) = self.brocardi.discover_article_url(section_url, &base_number).await else {
            return Ok(EnrichmentOutcome::Empty);
        };

        let is_civil_code = normalized == "codice.civile";
        Ok(self.brocardi.extract_article_page(&article_url, is_civil_code).await)
    }

    /// `FetchAmendmentHistory` (spec §4.9, §6).
    pub async fn fetch_amendment_history(
        &self,
        urn: &CanonicalUrn,
        filter_to_article: Option<&str>,
    ) -> LegalNormResult<Vec<AmendmentRecord>> {
        let CanonicalUrn::Nir(nir) = urn else {
            return Ok(Vec::new());
        };
        let article_html = self.fetch_normattiva_html(nir).await?;
        let Some(caps) = AGGIORNAMENTI_BUTTON_PATTERN.captures(&article_html) else {
            return Ok(Vec::new());
        };
        let data_href = caps[1].to_string();
        let amendments_url = format!("https://www.normattiva.it{data_href}");
        let response = self.fetcher.fetch(&amendments_url, NORMATTIVA_TAG).await?;

        if response.text.contains(SESSION_EXPIRED_MARKER) {
            return Err(LegalNormError::network(&amendments_url, "normattiva session expired"));
        }

        amendments::extract_amendment_history(&response.text, filter_to_article, self.destination_parser.as_ref())
            .await
    }

    /// `FetchVersionAt` (spec §6): appends/replaces the `!vig=` suffix
    /// before refetching the article text.
    pub async fn fetch_version_at(&self, urn: &CanonicalUrn, date: &str) -> LegalNormResult<ResolvedArticleText> {
        let versioned = match urn {
            CanonicalUrn::Nir(nir) => CanonicalUrn::Nir(normattiva::with_version_suffix(nir, &format!("!vig={date}"))),
            CanonicalUrn::EuUrl(_) => {
                return Err(LegalNormError::validation("urn", "versioned fetch is not supported for EU acts"))
            }
        };
        self.fetch_article_text(&versioned, None).await
    }

    async fn fetch_normattiva_html(&self, urn: &str) -> LegalNormResult<String> {
        if let Some(cached) = self.cache.get(NORMATTIVA_TAG, urn).await {
            if let Some(text) = cached.as_str() {
                return Ok(text.to_string());
            }
        }
        let url = format!("https://www.normattiva.it/uri-res/N2Ls?{urn}");
        let response = self.fetcher.fetch(&url, NORMATTIVA_TAG).await?;
        self.cache.set(NORMATTIVA_TAG, urn, serde_json::json!(response.text)).await;
        Ok(response.text)
    }
}

fn parse_eli_url(url: &str) -> Option<(String, String, String)> {
    let caps = ELI_URL_PATTERN.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalnorm_cache::MemoryCache;
    use legalnorm_core::{Config, VersionKind};

    fn engine() -> Engine {
        let config = Config::default();
        let fetcher = Arc::new(Fetcher::new(&config.fetch));
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(100));
        Engine::new(fetcher, cache)
    }

    #[tokio::test]
    async fn resolve_reference_builds_a_urn() {
        let engine = engine();
        let reference = ActReference::new(
            "legge",
            Some("1990-08-07".to_string()),
            Some("241".to_string()),
            "2",
            None,
            VersionKind::Absent,
            None,
        );
        let urn = engine.resolve_reference(&reference).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:legge:1990-08-07;241~art2");
    }

    #[tokio::test]
    async fn default_annex_is_reinjected_when_caller_omits_one() {
        let engine = engine();
        let reference = ActReference::new("codice civile", None, None, "1414", None, VersionKind::Absent, None);
        let urn = engine.resolve_reference_with_default_annex(&reference).await.unwrap();
        assert!(urn.as_str().contains(":2~art1414"));
    }

    #[tokio::test]
    async fn eli_url_parsing_extracts_kind_year_number() {
        let parsed = parse_eli_url("https://eur-lex.europa.eu/eli/reg/2016/679/oj/ita");
        assert_eq!(parsed, Some(("reg".to_string(), "2016".to_string(), "679".to_string())));
    }

    #[tokio::test]
    async fn eu_article_without_number_is_a_validation_error() {
        let engine = engine();
        let urn = CanonicalUrn::EuUrl("https://eur-lex.europa.eu/eli/reg/2016/679/oj/ita".to_string());
        let err = engine.fetch_article_text(&urn, None).await.unwrap_err();
        assert!(matches!(err, LegalNormError::Validation { .. }));
    }

    #[tokio::test]
    async fn versioned_fetch_rejects_eu_acts() {
        let engine = engine();
        let urn = CanonicalUrn::EuUrl("https://eur-lex.europa.eu/eli/reg/2016/679/oj/ita".to_string());
        let err = engine.fetch_version_at(&urn, "2020-01-01").await.unwrap_err();
        assert!(matches!(err, LegalNormError::Validation { .. }));
    }
}
