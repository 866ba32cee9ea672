use std::sync::Arc;

use clap::Args;
use futures::StreamExt;
use legalnorm_aggregate::{stream_aggregated, ApiServer, Engine};
use legalnorm_core::{ActReference, CanonicalUrn, LegalNormResult, VersionKind};

use crate::utils::{print_error, print_info, print_success};

fn parse_urn(raw: &str) -> CanonicalUrn {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        CanonicalUrn::EuUrl(raw.to_string())
    } else {
        CanonicalUrn::Nir(raw.to_string())
    }
}

#[derive(Args)]
pub struct ReferenceArgs {
    #[arg(long)]
    pub act_type: String,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub act_number: Option<String>,
    #[arg(long, default_value = "")]
    pub article: String,
    #[arg(long)]
    pub annex: Option<String>,
}

impl ReferenceArgs {
    fn into_reference(self) -> ActReference {
        ActReference::new(self.act_type, self.date, self.act_number, self.article, self.annex, VersionKind::Absent, None)
    }
}

/// `legalnorm resolve` — builds a canonical URN from an act reference
/// (spec §6 `ResolveReference`).
#[derive(Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub reference: ReferenceArgs,
}

impl ResolveCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let reference = self.reference.into_reference();
        match engine.resolve_reference_with_default_annex(&reference).await {
            Ok(urn) => print_success(&format!("resolved: {}", urn.as_str())),
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm article` — fetches a single article's text (spec §6
/// `FetchArticleText`).
#[derive(Args)]
pub struct ArticleCommand {
    #[arg(long)]
    pub urn: String,
    #[arg(long)]
    pub eu_article_number: Option<String>,
}

impl ArticleCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let urn = parse_urn(&self.urn);
        match engine.fetch_article_text(&urn, self.eu_article_number.as_deref()).await {
            Ok(resolved) => println!("{}", resolved.text),
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm tree` — lists an act's article/attachment structure (spec
/// §6 `FetchTree`).
#[derive(Args)]
pub struct TreeCommand {
    #[arg(long)]
    pub urn: String,
    #[arg(long, default_value_t = true)]
    pub with_links: bool,
    #[arg(long, default_value_t = false)]
    pub with_details: bool,
    #[arg(long, default_value_t = false)]
    pub with_metadata: bool,
}

impl TreeCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let urn = parse_urn(&self.urn);
        match engine.fetch_tree(&urn, self.with_links, self.with_details, self.with_metadata).await {
            Ok(tree) => {
                print_info(&format!("{} entries", tree.count));
                match serde_json::to_string_pretty(&tree) {
                    Ok(json) => println!("{json}"),
                    Err(err) => print_error(&err.to_string()),
                }
            }
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm enrichment` — fetches Brocardi commentary for an act
/// reference (spec §6 `FetchEnrichment`).
#[derive(Args)]
pub struct EnrichmentCommand {
    #[command(flatten)]
    pub reference: ReferenceArgs,
}

impl EnrichmentCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let reference = self.reference.into_reference();
        match engine.fetch_enrichment(&reference).await {
            Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
                Ok(json) => println!("{json}"),
                Err(err) => print_error(&err.to_string()),
            },
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm amendments` — lists an article's amendment history (spec
/// §6 `FetchAmendmentHistory`).
#[derive(Args)]
pub struct AmendmentsCommand {
    #[arg(long)]
    pub urn: String,
    #[arg(long)]
    pub article: Option<String>,
}

impl AmendmentsCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let urn = parse_urn(&self.urn);
        match engine.fetch_amendment_history(&urn, self.article.as_deref()).await {
            Ok(records) => {
                print_info(&format!("{} amendment(s)", records.len()));
                match serde_json::to_string_pretty(&records) {
                    Ok(json) => println!("{json}"),
                    Err(err) => print_error(&err.to_string()),
                }
            }
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm version-at` — fetches an article as it read on a given
/// date (spec §6 `FetchVersionAt`).
#[derive(Args)]
pub struct VersionAtCommand {
    #[arg(long)]
    pub urn: String,
    #[arg(long)]
    pub date: String,
}

impl VersionAtCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let urn = parse_urn(&self.urn);
        match engine.fetch_version_at(&urn, &self.date).await {
            Ok(resolved) => println!("{}", resolved.text),
            Err(err) => print_error(&err.to_string()),
        }
        Ok(())
    }
}

/// `legalnorm stream` — prints the ndjson aggregation stream for a whole
/// act/article-spec to stdout (spec §6 `StreamAggregated`).
#[derive(Args)]
pub struct StreamCommand {
    #[command(flatten)]
    pub reference: ReferenceArgs,
}

impl StreamCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        let reference = self.reference.into_reference();
        let mut lines = Box::pin(stream_aggregated(engine, reference));
        while let Some(line) = lines.next().await {
            println!("{line}");
        }
        Ok(())
    }
}

/// `legalnorm serve` — starts the HTTP API server (spec §6).
#[derive(Args)]
pub struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

impl ServeCommand {
    pub async fn execute(self, engine: Arc<Engine>) -> LegalNormResult<()> {
        print_info(&format!("starting server on {}:{}", self.host, self.port));
        ApiServer::new(self.host, self.port, engine).start().await
    }
}
