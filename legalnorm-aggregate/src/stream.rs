//! `StreamAggregated` (C11, spec §4.11, §6).
//!
//! One ndjson line per concrete article, in request order: fetches run
//! concurrently across articles, but each line is only emitted once its
//! article is fully resolved, and a 50ms pause separates emissions so a
//! slow consumer isn't flooded.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::{FuturesOrdered, Stream};
use futures::StreamExt;
use legalnorm_core::{ActReference, CanonicalUrn, EnrichmentOutcome};
use serde::Serialize;
use serde_json::json;

use crate::article_spec::expand_article_spec;
use crate::engine::Engine;

const EMIT_PAUSE: Duration = Duration::from_millis(50);

#[derive(Serialize)]
struct AggregatedLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    article_text: Option<String>,
    norma_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brocardi_info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Resolves `reference`'s tree, expands its article spec against it, and
/// streams one ndjson line per article as soon as that article's fetch
/// (and, for Normattiva sources, its Brocardi enrichment) completes.
pub fn stream_aggregated(engine: Arc<Engine>, reference: ActReference) -> impl Stream<Item = String> {
    stream! {
        let urn = match engine.resolve_reference_with_default_annex(&reference).await {
            Ok(urn) => urn,
            Err(err) => {
                yield line_for_error(&reference.article, &err.to_string());
                return;
            }
        };

        let tree = match engine.fetch_tree(&urn, true, false, false).await {
            Ok(tree) => tree,
            Err(err) => {
                yield line_for_error(&reference.article, &err.to_string());
                return;
            }
        };

        let article_numbers = expand_article_spec(&reference.article, &tree.entries);
        let mut pending = FuturesOrdered::new();
        for numero in article_numbers {
            let engine = engine.clone();
            let urn = urn.clone();
            pending.push_back(async move { fetch_one(&engine, &urn, &numero).await });
        }

        let mut first = true;
        while let Some(line) = pending.next().await {
            if !first {
                tokio::time::sleep(EMIT_PAUSE).await;
            }
            first = false;
            yield line;
        }
    }
}

async fn fetch_one(engine: &Engine, urn: &CanonicalUrn, numero: &str) -> String {
    let eu_article = if urn.is_eu() { Some(numero) } else { None };
    match engine.fetch_article_text(urn, eu_article).await {
        Ok(resolved) => {
            let brocardi_info = if matches!(resolved.source, legalnorm_core::SourceTag::Normattiva) {
                enrichment_for(engine, urn, numero).await
            } else {
                None
            };
            serde_json::to_string(&AggregatedLine {
                article_text: Some(resolved.text),
                norma_data: numero.to_string(),
                url: Some(resolved.urn.as_str().to_string()),
                brocardi_info,
                error: None,
            })
            .unwrap_or_default()
        }
        Err(err) => line_for_error(numero, &err.to_string()),
    }
}

async fn enrichment_for(engine: &Engine, urn: &CanonicalUrn, numero: &str) -> Option<serde_json::Value> {
    let act_type = match urn {
        CanonicalUrn::Nir(s) => s.split(':').nth(2)?.to_string(),
        CanonicalUrn::EuUrl(_) => return None,
    };
    let reference = ActReference::new(act_type, None, None, numero, None, legalnorm_core::VersionKind::Absent, None);
    match engine.fetch_enrichment(&reference).await {
        Ok(EnrichmentOutcome::Found(record)) => serde_json::to_value(record).ok(),
        Ok(EnrichmentOutcome::Empty) | Err(_) => None,
    }
}

fn line_for_error(numero: &str, message: &str) -> String {
    serde_json::to_string(&json!({ "error": message, "norma_data": numero })).unwrap_or_default()
}
