use anyhow::Result;
use bugloc_core::{Normalization, Weighting, WeightingStrategy, DEFAULT_MAX_HITS};
use clap::{Parser, Subcommand};
use searcher::{run_lda, run_vsm, SearchConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Rank source files for every bug report in a directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vector-space ranking
    Vsm {
        index: PathBuf,
        queries: PathBuf,
        results: PathBuf,
        /// basic (1), sublinear (2) or boolean (3)
        #[arg(long, default_value_t = Weighting::Basic)]
        weighting: Weighting,
        /// cosine (1) or overlap (2)
        #[arg(long, default_value_t = Normalization::Cosine)]
        normalization: Normalization,
        #[arg(long, default_value_t = DEFAULT_MAX_HITS)]
        max_hits: usize,
    },
    /// Topic-model reranking
    Lda {
        index: PathBuf,
        /// Topic-model bundle written by the indexer
        lda_index: PathBuf,
        queries: PathBuf,
        results: PathBuf,
        /// Topic count; defaults to the lowest one in the bundle
        #[arg(long)]
        k: Option<usize>,
        #[arg(long, default_value_t = DEFAULT_MAX_HITS)]
        max_hits: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let summary = match cli.command {
        Commands::Vsm { index, queries, results, weighting, normalization, max_hits } => {
            let strategy = WeightingStrategy::new(weighting, normalization);
            run_vsm(&index, &queries, &results, strategy, max_hits)?
        }
        Commands::Lda { index, lda_index, queries, results, k, max_hits } => {
            run_lda(&index, &lda_index, &queries, &results, SearchConfig { max_hits, k })?
        }
    };
    if summary.failed > 0 {
        let total = summary.executed + summary.skipped + summary.failed;
        eprintln!("{} of {} queries failed", summary.failed, total);
    }
    Ok(())
}
