use crate::commands::*;
use clap::{Parser, Subcommand};
use legalnorm_core::LegalNormResult;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "legalnorm")]
#[command(about = "Federated retrieval and enrichment engine for Italian and EU legal norms")]
#[command(version = "1.0.0")]
#[command(author = "LegalNorm Development Team")]
pub struct LegalNormCli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    Resolve(ResolveCommand),
    Article(ArticleCommand),
    Tree(TreeCommand),
    Enrichment(EnrichmentCommand),
    Amendments(AmendmentsCommand),
    VersionAt(VersionAtCommand),
    Stream(StreamCommand),
    Serve(ServeCommand),
}

impl LegalNormCli {
    pub async fn run(self, engine: Arc<legalnorm_aggregate::Engine>) -> LegalNormResult<()> {
        if self.verbose {
            tracing::info!("running legalnorm-cli in verbose mode");
        }

        match self.command {
            Commands::Resolve(cmd) => cmd.execute(engine).await,
            Commands::Article(cmd) => cmd.execute(engine).await,
            Commands::Tree(cmd) => cmd.execute(engine).await,
            Commands::Enrichment(cmd) => cmd.execute(engine).await,
            Commands::Amendments(cmd) => cmd.execute(engine).await,
            Commands::VersionAt(cmd) => cmd.execute(engine).await,
            Commands::Stream(cmd) => cmd.execute(engine).await,
            Commands::Serve(cmd) => cmd.execute(engine).await,
        }
    }
}
