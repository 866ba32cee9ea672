use std::sync::Arc;

use clap::Parser;
use legalnorm_cache::{Cache, MemoryCache, PersistentCache};
use legalnorm_cli::cli::LegalNormCli;
use legalnorm_cli::utils::print_banner;
use legalnorm_core::Config;
use legalnorm_fetch::Fetcher;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = LegalNormCli::parse();
    let config = Config::from_env();

    if matches!(cli.command, legalnorm_cli::cli::Commands::Serve(_)) {
        print_banner();
    }

    let fetcher = Arc::new(Fetcher::new(&config.fetch));
    let cache: Arc<dyn Cache> = if config.cache.base_dir.is_empty() {
        Arc::new(MemoryCache::new(config.cache.max_cache_size))
    } else {
        Arc::new(PersistentCache::new(config.cache.base_dir.clone(), config.cache.persistent_cache_ttl_secs))
    };
    let engine = Arc::new(legalnorm_aggregate::Engine::new(fetcher, cache));

    if let Err(err) = cli.run(engine).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
