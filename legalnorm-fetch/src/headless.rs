//! Headless-browser abstraction (spec §4.5, §4.7, §9 Open Questions).
//!
//! No example in the reference pack vendors a real browser-automation
//! crate, so this is expressed as a trait at the seam the spec itself
//! draws ("drive a headless-browser session"): EUR-Lex's WAF bypass (C7)
//! and the Normattiva date resolver (C5) both need one, but neither
//! needs to know which engine renders it. `NullBrowser` is the default,
//! always-unavailable backend; a real implementation (e.g. backed by a
//! `chromiumoxide` session) is wired in at the service boundary.

use async_trait::async_trait;
use std::time::Duration;

use legalnorm_core::{LegalNormError, LegalNormResult};

#[async_trait]
pub trait HeadlessBrowser: Send + Sync {
    async fn navigate(&self, url: &str) -> LegalNormResult<()>;

    /// Best-effort; ignores its own timeout (spec §4.5 step 2).
    async fn dismiss_consent_banner(&self);

    async fn fill(&self, selector: &str, text: &str) -> LegalNormResult<()>;

    async fn click(&self, selector: &str) -> LegalNormResult<()>;

    /// Tries each selector in order until one matches, returning its
    /// trimmed text content (spec §4.5 step 5).
    async fn first_matching_text(&self, selectors: &[&str], timeout: Duration) -> Option<String>;

    /// Full rendered HTML after the page reaches network-idle (spec
    /// §4.7's WAF bypass).
    async fn rendered_html(&self, url: &str) -> LegalNormResult<String>;
}

/// Always fails. Used when no browser backend is configured; callers
/// (`NormattivaDateResolver`, the EUR-Lex extractor) treat that
/// identically to a real browser session timing out.
pub struct NullBrowser;

#[async_trait]
impl HeadlessBrowser for NullBrowser {
    async fn navigate(&self, _url: &str) -> LegalNormResult<()> {
        Err(LegalNormError::network("headless-browser", "no browser backend configured"))
    }

    async fn dismiss_consent_banner(&self) {}

    async fn fill(&self, _selector: &str, _text: &str) -> LegalNormResult<()> {
        Err(LegalNormError::network("headless-browser", "no browser backend configured"))
    }

    async fn click(&self, _selector: &str) -> LegalNormResult<()> {
        Err(LegalNormError::network("headless-browser", "no browser backend configured"))
    }

    async fn first_matching_text(&self, _selectors: &[&str], _timeout: Duration) -> Option<String> {
        None
    }

    async fn rendered_html(&self, _url: &str) -> LegalNormResult<String> {
        Err(LegalNormError::network("headless-browser", "no browser backend configured"))
    }
}
