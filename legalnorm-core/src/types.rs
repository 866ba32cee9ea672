use serde::{Deserialize, Serialize};
use std::fmt;

/// Which version of an article text was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionKind {
    Absent,
    Originale,
    Vigente,
}

/// Input to `ResolveReference` (spec §3, `ActReference`).
///
/// Immutable once constructed; validation happens in
/// `crate::urn::UrnBuilder::build`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActReference {
    pub act_type: String,
    /// Either `"YYYY"` or `"YYYY-MM-DD"`; absent for codified works.
    pub date: Option<String>,
    pub act_number: Option<String>,
    /// May be a range (`"4-6"`), a comma list (`"1, 2-bis, 3"`), or empty
    /// (meaning "all articles").
    pub article: String,
    /// `None`, empty, `"null"` and `"undefined"` all coalesce to absent
    /// during construction — see `ActReference::new`.
    pub annex: Option<String>,
    pub version: VersionKind,
    /// Only meaningful when `version == Vigente`.
    pub version_date: Option<String>,
}

impl ActReference {
    pub fn new(
        act_type: impl Into<String>,
        date: Option<String>,
        act_number: Option<String>,
        article: impl Into<String>,
        annex: Option<String>,
        version: VersionKind,
        version_date: Option<String>,
    ) -> Self {
        Self {
            act_type: act_type.into(),
            date,
            act_number,
            article: article.into(),
            annex: coalesce_annex(annex),
            version,
            version_date,
        }
    }
}

/// Normalizes the four absent-spellings of `annex` to `None` (spec §3
/// invariants: `""`, `"null"`, `"undefined"` all coalesce to absent).
pub fn coalesce_annex(annex: Option<String>) -> Option<String> {
    annex.and_then(|a| {
        let trimmed = a.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("undefined")
        {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// The output of C2 (URN builder). Either a `urn:nir:stato:` URN for
/// Italian acts, or a fully qualified URL for EU acts/treaties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalUrn {
    Nir(String),
    EuUrl(String),
}

impl CanonicalUrn {
    pub fn as_str(&self) -> &str {
        match self {
            CanonicalUrn::Nir(s) => s.as_str(),
            CanonicalUrn::EuUrl(s) => s.as_str(),
        }
    }

    pub fn is_eu(&self) -> bool {
        matches!(self, CanonicalUrn::EuUrl(_))
    }
}

impl fmt::Display for CanonicalUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTag {
    Normattiva,
    EurLex,
    Brocardi,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Normattiva => "normattiva",
            SourceTag::EurLex => "eurlex",
            SourceTag::Brocardi => "brocardi",
        }
    }
}

/// Output of `FetchArticleText` (spec §3, `ResolvedArticleText`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedArticleText {
    pub text: String,
    pub urn: CanonicalUrn,
    pub link_map: Option<std::collections::HashMap<String, String>>,
    pub source: SourceTag,
}

/// One entry of a flattened tree result (spec §3, `TreeNode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TreeEntry {
    SectionHeader {
        text: String,
    },
    Article {
        numero: String,
        /// `None` for the main body (dispositivo), else the 1-based
        /// index of the enclosing annex.
        allegato: Option<u32>,
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnnexMetadata {
    pub label: String,
    pub article_count: usize,
    pub article_numbers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeMetadata {
    /// Keyed by annex index as a string, with `"Dispositivo"` for the
    /// main body.
    pub annexes: std::collections::BTreeMap<String, AnnexMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeResult {
    pub entries: Vec<TreeEntry>,
    pub count: usize,
    pub metadata: Option<TreeMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmendmentKind {
    Abrogates,
    Substitutes,
    Modifies,
    Inserts,
}

impl AmendmentKind {
    /// Maps the Italian verbal forms used by Normattiva's amendments
    /// table to a kind (grounded on `TipoModifica.from_string` in the
    /// original Python implementation).
    pub fn from_italian(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        if s.contains("abrog") {
            Some(Self::Abrogates)
        } else if s.contains("sostitu") {
            Some(Self::Substitutes)
        } else if s.contains("modific") {
            Some(Self::Modifies)
        } else if s.contains("inser") || s.contains("introdu") {
            Some(Self::Inserts)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub kind: AmendmentKind,
    pub modifying_act_urn: String,
    pub modifying_act_label: String,
    pub disposition: String,
    pub destination: String,
    pub effective_date: String,
    pub gazette_date: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Massima {
    pub authority: String,
    pub number: String,
    pub year: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRelation {
    pub kind: String,
    pub title: String,
    pub paragraph: Option<String>,
    pub text: String,
    pub cited_articles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footnote {
    pub number: String,
    pub text: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelatedArticles {
    pub previous: Option<ArticleLink>,
    pub next: Option<ArticleLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleLink {
    pub number: String,
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReference {
    pub article: String,
    pub act_type: String,
    pub url: String,
    pub section: String,
}

/// Output of `FetchEnrichment` (spec §3, `EnrichmentRecord`). All
/// sub-sections are independently optional: each Brocardi extraction
/// step fails on its own without aborting the whole record (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnrichmentRecord {
    pub position: Option<String>,
    pub brocardi_url: Option<String>,
    pub brocardi_maxims: Vec<Massima>,
    pub ratio: Option<String>,
    pub explanation: Option<String>,
    pub glossary_entries: Vec<String>,
    pub historical_relations: Vec<HistoricalRelation>,
    pub footnotes: Vec<Footnote>,
    pub related_articles: RelatedArticles,
    pub cross_references: Vec<CrossReference>,
}

/// `FetchEnrichment` distinguishes "no commentary for this act" from a
/// hard error (spec §6, §9 Open Questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnrichmentOutcome {
    Found(EnrichmentRecord),
    Empty,
}
