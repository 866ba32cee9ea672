//! Article-set resolution, parallel fan-out and ndjson streaming
//! aggregation (C11, spec §4.11).

pub mod article_spec;
pub mod engine;
pub mod handlers;
pub mod server;
pub mod stream;

pub use engine::Engine;
pub use server::ApiServer;
pub use stream::stream_aggregated;
