//! URN builder (spec §4.2, §6, C2).
//!
//! Grounded on `original_source/NEWVERSION/utils/urn.py::generate_urn` for
//! the step ordering, and on the bit-exact grammar in spec §6:
//!
//! ```text
//! urn             = "urn:nir:stato:" act-url
//! act-url         = act-type ":" date ";" number [":" annex] [article-part] [version-part]
//! article-part    = "~art" DIGITS [extension]
//! version-part    = "@originale" | ("!vig=" YYYY "-" MM "-" DD)
//! ```

use async_trait::async_trait;

use crate::act_type::{self, CODICI_URN, EU_KINDS, TREATY_TOKENS};
use crate::error::{LegalNormError, LegalNormResult};
use crate::types::{ActReference, CanonicalUrn, VersionKind};

/// Fixed treaty URLs (spec §3, §6).
fn treaty_url(token: &str) -> Option<&'static str> {
    match token {
        "TUE" => Some("https://eur-lex.europa.eu/legal-content/IT/TXT/?uri=CELEX:12012M/TXT"),
        "TFUE" => Some("https://eur-lex.europa.eu/legal-content/IT/TXT/?uri=CELEX:12012E/TXT"),
        "CDFUE" => Some("https://eur-lex.europa.eu/legal-content/IT/TXT/?uri=CELEX:12012P/TXT"),
        _ => None,
    }
}

/// Sentinel returned by a `DateResolver` that could not complete a
/// year-only date (spec §4.5 "Failure modes"). The caller (this builder)
/// treats it identically to a resolver that is simply absent.
pub const DATE_RESOLVER_SENTINEL: &str = "__DATE_RESOLUTION_FAILED__";

/// Completes a year-only date into a full `YYYY-MM-DD` date (C5). Kept as
/// a trait here, rather than in `legalnorm-fetch`, so `UrnBuilder::build`
/// can depend on the capability without the core crate depending on the
/// concrete headless-browser implementation.
#[async_trait]
pub trait DateResolver: Send + Sync {
    /// Returns `None` on any failure (timeout, selector miss, exception);
    /// never panics, never retries (spec §4.5, §9).
    async fn resolve_date(&self, act_type: &str, year: &str, act_number: &str) -> Option<String>;
}

/// A resolver that always fails, used when date completion is
/// unavailable or not configured.
pub struct NoDateResolver;

#[async_trait]
impl DateResolver for NoDateResolver {
    async fn resolve_date(&self, _act_type: &str, _year: &str, _act_number: &str) -> Option<String> {
        None
    }
}

pub struct UrnBuilder;

impl UrnBuilder {
    /// Builds a `CanonicalUrn` from an `ActReference` (spec §4.2).
    ///
    /// `resolver` is consulted only when `date` is year-only and
    /// `act_number` is present; its failure falls back to `YYYY-01-01`
    /// (spec §4.2 step 4, §8 "Date fallback").
    pub async fn build(reference: &ActReference, resolver: &dyn DateResolver) -> LegalNormResult<CanonicalUrn> {
        if reference.act_type.trim().is_empty() {
            return Err(LegalNormError::validation("act_type", "act_type is required"));
        }

        // Treaties pass straight through to their fixed URLs (step 1 is a
        // no-op for these; they never reach CANONICAL/CODICI_URN).
        if TREATY_TOKENS.contains(&reference.act_type.as_str()) {
            let url = treaty_url(&reference.act_type)
                .ok_or_else(|| LegalNormError::validation("act_type", "unknown treaty token"))?;
            return Ok(CanonicalUrn::EuUrl(url.to_string()));
        }

        // Step 1: normalize act type.
        let normalized = act_type::normalize_act_type(&reference.act_type);

        // Step 2: EU kind dispatch, using only the year portion of `date`.
        if act_type::is_eu_kind(&normalized) {
            return Self::build_eu(&normalized, reference);
        }

        // Step 3: codified-code stem, with its default annex stripped.
        let (type_and_maybe_number, default_annex) = if let Some(stem) = CODICI_URN.get(normalized.as_str()) {
            Self::strip_default_annex(stem)
        } else {
            (None, None)
        };

        let body = if let Some(stem) = type_and_maybe_number {
            stem
        } else {
            // Step 4: obtain a YYYY-MM-DD date, resolving year-only dates.
            let date = reference
                .date
                .as_deref()
                .ok_or_else(|| LegalNormError::validation("date", "date is required for this act type"))?;
            let full_date = Self::full_date(&normalized, date, reference.act_number.as_deref(), resolver).await?;
            let number = reference
                .act_number
                .as_deref()
                .ok_or_else(|| LegalNormError::validation("act_number", "act_number is required"))?;
            format!("{normalized}:{full_date};{number}")
        };

        let mut urn = format!("urn:nir:stato:{body}");

        // Step 5: explicit annex, else the stripped default for codified
        // works whose stem carried one (spec §4.2 edge cases, §9).
        let annex = reference.annex.clone().or(default_annex);
        if let Some(annex) = annex {
            urn.push(':');
            urn.push_str(&annex);
        }

        // Step 6: article suffix.
        if !reference.article.trim().is_empty() {
            let (base, extension) = Self::split_article(&reference.article)?;
            urn.push_str("~art");
            urn.push_str(&base);
            if let Some(ext) = extension {
                urn.push_str(&ext);
            }
        }

        // Step 7: version suffix.
        match reference.version {
            VersionKind::Absent => {}
            VersionKind::Originale => urn.push_str("@originale"),
            VersionKind::Vigente => {
                let date = reference
                    .version_date
                    .as_deref()
                    .ok_or_else(|| LegalNormError::validation("version_date", "version_date required for vigente"))?;
                urn.push_str("!vig=");
                urn.push_str(date);
            }
        }

        Ok(CanonicalUrn::Nir(urn))
    }

    fn build_eu(normalized: &str, reference: &ActReference) -> LegalNormResult<CanonicalUrn> {
        let kind = EU_KINDS
            .get(normalized)
            .ok_or_else(|| LegalNormError::validation("act_type", "unrecognized EU act kind"))?;
        let date = reference
            .date
            .as_deref()
            .ok_or_else(|| LegalNormError::validation("date", "date is required for EU acts"))?;
        let year = &date[..date.len().min(4)];
        let number = reference
            .act_number
            .as_deref()
            .ok_or_else(|| LegalNormError::validation("act_number", "act_number is required for EU acts"))?;
        Ok(CanonicalUrn::EuUrl(format!(
            "https://eur-lex.europa.eu/eli/{kind}/{year}/{number}/oj/ita"
        )))
    }

    /// Strips a trailing `:N` annex from a codified-code stem (spec §4.2
    /// step 3), returning `(stem_without_annex, Some(N))`, or
    /// `(stem, None)` if there was none.
    fn strip_default_annex(stem: &str) -> (Option<String>, Option<String>) {
        match stem.rsplit_once(':') {
            // Only treat the trailing segment as an annex if the stem
            // already has the `type:date;number` shape, i.e. contains a
            // `;`. A bare token like "costituzione" has no `;` and must
            // not be mistaken for `type:annex`.
            Some((head, tail)) if head.contains(';') && tail.chars().all(|c| c.is_ascii_alphanumeric()) => {
                (Some(head.to_string()), Some(tail.to_string()))
            }
            _ => (Some(stem.to_string()), None),
        }
    }

    /// Resolves a possibly year-only `date` into `YYYY-MM-DD` (spec §4.2
    /// step 4, §4.5, §8 "Date fallback").
    async fn full_date(
        act_type: &str,
        date: &str,
        act_number: Option<&str>,
        resolver: &dyn DateResolver,
    ) -> LegalNormResult<String> {
        if date.len() == 4 && date.chars().all(|c| c.is_ascii_digit()) {
            if let Some(number) = act_number {
                if let Some(resolved) = resolver.resolve_date(act_type, date, number).await {
                    if resolved != DATE_RESOLVER_SENTINEL {
                        return Ok(resolved);
                    }
                }
            }
            return Ok(format!("{date}-01-01"));
        }
        Ok(date.to_string())
    }

    /// Splits `"4-bis"` into `("4", Some("bis"))`, stripping `art`/
    /// `articolo` prefixes first (spec §4.2 step 6).
    fn split_article(article: &str) -> LegalNormResult<(String, Option<String>)> {
        let trimmed = article.trim();
        let stripped = trimmed
            .strip_prefix("articolo")
            .or_else(|| trimmed.strip_prefix("art."))
            .or_else(|| trimmed.strip_prefix("art"))
            .unwrap_or(trimmed)
            .trim();
        let mut parts = stripped.splitn(2, '-');
        let base = parts.next().unwrap_or("").trim();
        if base.is_empty() || !base.chars().next().unwrap().is_ascii_digit() {
            return Err(LegalNormError::validation("article", format!("invalid article '{article}'")));
        }
        let extension = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok((base.to_string(), extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(
        act_type: &str,
        date: Option<&str>,
        number: Option<&str>,
        article: &str,
    ) -> ActReference {
        ActReference::new(
            act_type,
            date.map(str::to_string),
            number.map(str::to_string),
            article,
            None,
            VersionKind::Absent,
            None,
        )
    }

    #[tokio::test]
    async fn builds_simple_legge_urn() {
        let r = reference("legge", Some("1990-08-07"), Some("241"), "2");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:legge:1990-08-07;241~art2");
    }

    #[tokio::test]
    async fn falls_back_to_jan_1_on_year_only_date_and_failed_resolver() {
        let r = reference("legge", Some("1990"), Some("241"), "");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:legge:1990-01-01;241");
    }

    #[tokio::test]
    async fn codified_code_strips_default_annex_unless_requested() {
        let r = reference("codice civile", None, None, "1414");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        // The builder itself strips the default; the service layer (not
        // this module) re-injects it when the caller omitted an annex.
        assert_eq!(urn.as_str(), "urn:nir:stato:regio.decreto:1942-03-16;262~art1414");
    }

    #[tokio::test]
    async fn explicit_annex_is_appended() {
        let mut r = reference("codice civile", None, None, "1414");
        r.annex = Some("2".to_string());
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:regio.decreto:1942-03-16;262:2~art1414");
    }

    #[tokio::test]
    async fn eu_act_builds_eli_url() {
        let r = reference("regolamento ue", Some("2016-04-27"), Some("679"), "7");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert_eq!(urn.as_str(), "https://eur-lex.europa.eu/eli/reg/2016/679/oj/ita");
        assert!(urn.is_eu());
    }

    #[tokio::test]
    async fn treaty_token_maps_to_fixed_url() {
        let r = reference("TUE", None, None, "");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert!(urn.as_str().contains("12012M"));
    }

    #[tokio::test]
    async fn article_with_extension_suffix() {
        let r = reference("legge", Some("1990-08-07"), Some("241"), "2-bis");
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:legge:1990-08-07;241~art2bis");
    }

    #[tokio::test]
    async fn vigente_version_suffix() {
        let mut r = reference("legge", Some("1990-08-07"), Some("241"), "2");
        r.version = VersionKind::Vigente;
        r.version_date = Some("2020-01-01".to_string());
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert!(urn.as_str().ends_with("!vig=2020-01-01"));
    }

    #[tokio::test]
    async fn originale_version_suffix() {
        let mut r = reference("legge", Some("1990-08-07"), Some("241"), "2");
        r.version = VersionKind::Originale;
        let urn = UrnBuilder::build(&r, &NoDateResolver).await.unwrap();
        assert!(urn.as_str().ends_with("@originale"));
    }

    #[tokio::test]
    async fn invalid_article_is_a_validation_error() {
        let r = reference("legge", Some("1990-08-07"), Some("241"), "XYZ");
        let err = UrnBuilder::build(&r, &NoDateResolver).await.unwrap_err();
        assert!(matches!(err, LegalNormError::Validation { .. }));
    }

    #[tokio::test]
    async fn empty_act_type_is_a_validation_error() {
        let r = reference("", None, None, "");
        let err = UrnBuilder::build(&r, &NoDateResolver).await.unwrap_err();
        assert!(matches!(err, LegalNormError::Validation { .. }));
    }

    struct StubResolver;

    #[async_trait]
    impl DateResolver for StubResolver {
        async fn resolve_date(&self, _: &str, year: &str, _: &str) -> Option<String> {
            Some(format!("{year}-05-15"))
        }
    }

    #[tokio::test]
    async fn resolver_success_overrides_jan_1_fallback() {
        let r = reference("legge", Some("1990"), Some("241"), "");
        let urn = UrnBuilder::build(&r, &StubResolver).await.unwrap();
        assert_eq!(urn.as_str(), "urn:nir:stato:legge:1990-05-15;241");
    }
}
