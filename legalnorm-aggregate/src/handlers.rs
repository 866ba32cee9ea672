//! HTTP handlers for the seven external operations (spec §6), thin
//! wrappers translating `Engine` calls into JSON/ndjson responses.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use futures::StreamExt;
use legalnorm_core::{ActReference, CanonicalUrn, LegalNormError, VersionKind};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::stream::stream_aggregated;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy".to_string(), version: env!("CARGO_PKG_VERSION").to_string() })
}

#[derive(Deserialize)]
pub struct ReferenceQuery {
    pub act_type: String,
    pub date: Option<String>,
    pub act_number: Option<String>,
    #[serde(default)]
    pub article: String,
    pub annex: Option<String>,
}

impl ReferenceQuery {
    fn into_reference(self) -> ActReference {
        ActReference::new(self.act_type, self.date, self.act_number, self.article, self.annex, VersionKind::Absent, None)
    }
}

fn into_response(result: Result<impl Serialize, LegalNormError>) -> Response {
    match result {
        Ok(body) => Json(serde_json::json!(body)).into_response(),
        Err(err) => legal_error_response(&err),
    }
}

fn legal_error_response(err: &LegalNormError) -> Response {
    let status = match err {
        LegalNormError::Validation { .. } => StatusCode::BAD_REQUEST,
        LegalNormError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
        LegalNormError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        LegalNormError::NetworkError { .. } => StatusCode::BAD_GATEWAY,
        LegalNormError::Parsing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

pub async fn resolve_reference_handler(State(engine): State<Arc<Engine>>, Query(query): Query<ReferenceQuery>) -> Response {
    let reference = query.into_reference();
    into_response(engine.resolve_reference_with_default_annex(&reference).await.map(|urn| urn.as_str().to_string()))
}

#[derive(Deserialize)]
pub struct ArticleTextQuery {
    pub urn: String,
    pub eu_article_number: Option<String>,
}

pub async fn fetch_article_text_handler(State(engine): State<Arc<Engine>>, Query(query): Query<ArticleTextQuery>) -> Response {
    let urn = parse_urn_param(&query.urn);
    into_response(engine.fetch_article_text(&urn, query.eu_article_number.as_deref()).await)
}

#[derive(Deserialize)]
pub struct TreeQuery {
    pub urn: String,
    #[serde(default)]
    pub with_links: bool,
    #[serde(default)]
    pub with_details: bool,
    #[serde(default)]
    pub with_metadata: bool,
}

pub async fn fetch_tree_handler(State(engine): State<Arc<Engine>>, Query(query): Query<TreeQuery>) -> Response {
    let urn = parse_urn_param(&query.urn);
    into_response(engine.fetch_tree(&urn, query.with_links, query.with_details, query.with_metadata).await)
}

pub async fn fetch_enrichment_handler(State(engine): State<Arc<Engine>>, Query(query): Query<ReferenceQuery>) -> Response {
    let reference = query.into_reference();
    into_response(engine.fetch_enrichment(&reference).await)
}

#[derive(Deserialize)]
pub struct AmendmentHistoryQuery {
    pub urn: String,
    pub article: Option<String>,
}

pub async fn fetch_amendment_history_handler(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<AmendmentHistoryQuery>,
) -> Response {
    let urn = parse_urn_param(&query.urn);
    into_response(engine.fetch_amendment_history(&urn, query.article.as_deref()).await)
}

#[derive(Deserialize)]
pub struct VersionAtQuery {
    pub urn: String,
    pub date: String,
}

pub async fn fetch_version_at_handler(State(engine): State<Arc<Engine>>, Query(query): Query<VersionAtQuery>) -> Response {
    let urn = parse_urn_param(&query.urn);
    into_response(engine.fetch_version_at(&urn, &query.date).await)
}

pub async fn stream_aggregated_handler(State(engine): State<Arc<Engine>>, Query(query): Query<ReferenceQuery>) -> Response {
    let reference = query.into_reference();
    let body = stream_aggregated(engine, reference).map(|line| Ok::<_, std::io::Error>(format!("{line}\n")));
    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(axum::body::Body::from_stream(body))
        .unwrap()
}

fn parse_urn_param(raw: &str) -> CanonicalUrn {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        CanonicalUrn::EuUrl(raw.to_string())
    } else {
        CanonicalUrn::Nir(raw.to_string())
    }
}
