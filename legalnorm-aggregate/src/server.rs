//! Axum HTTP server exposing the seven external operations (spec §6).

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use legalnorm_core::{LegalNormError, LegalNormResult};
use tower_http::cors::CorsLayer;

use crate::engine::Engine;
use crate::handlers::{
    fetch_amendment_history_handler, fetch_article_text_handler, fetch_enrichment_handler, fetch_tree_handler,
    fetch_version_at_handler, health_handler, resolve_reference_handler, stream_aggregated_handler,
};

pub struct ApiServer {
    host: String,
    port: u16,
    engine: Arc<Engine>,
}

impl ApiServer {
    pub fn new(host: String, port: u16, engine: Arc<Engine>) -> Self {
        Self { host, port, engine }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/reference", get(resolve_reference_handler))
            .route("/article", get(fetch_article_text_handler))
            .route("/tree", get(fetch_tree_handler))
            .route("/enrichment", get(fetch_enrichment_handler))
            .route("/amendments", get(fetch_amendment_history_handler))
            .route("/version-at", get(fetch_version_at_handler))
            .route("/stream", get(stream_aggregated_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.engine.clone())
    }

    pub async fn start(self) -> LegalNormResult<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", self.host, self.port))
            .await
            .map_err(|e| LegalNormError::network("bind", e.to_string()))?;

        tracing::info!(host = %self.host, port = self.port, "legalnorm-aggregate listening");

        axum::serve(listener, app).await.map_err(|e| LegalNormError::network("serve", e.to_string()))?;

        Ok(())
    }
}
