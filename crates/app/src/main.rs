use anyhow::{bail, ensure, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fts_ingest_core::{
    search, IngestCoordinator, IngestionOptions, RankWeights, SearchQuery, SqliteStore,
    StoreConfig, DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION, DEFAULT_TAG, DEFAULT_TOKENIZER,
    DEFAULT_TOP_K,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "fts-ingest",
    version,
    after_help = "Examples:\n  fts-ingest ingest --db quotes.db --root ./docs --batch-size 500 --verbose\n  fts-ingest search --db quotes.db --query 'pump AND valve'"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log per-batch progress
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load every file under a folder into the full-text collection.
    Ingest {
        /// SQLite database file, created if missing.
        #[arg(long, env = "FTS_INGEST_DB")]
        db: PathBuf,
        /// Folder scanned recursively.
        #[arg(long, env = "FTS_INGEST_ROOT")]
        root: PathBuf,
        /// Records per insert transaction.
        #[arg(long, env = "FTS_INGEST_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Stop after this many files.
        #[arg(long, env = "FTS_INGEST_MAX_FILES")]
        max_files: Option<usize>,
        /// Read at most this many bytes per file (0 reads everything).
        #[arg(long, env = "FTS_INGEST_LIMIT_BYTES")]
        limit_bytes: Option<u64>,
        /// Text stored in the tag column of every record.
        #[arg(long, env = "FTS_INGEST_TAG", default_value = DEFAULT_TAG)]
        tag: String,
        /// Full-text table name.
        #[arg(long, env = "FTS_INGEST_COLLECTION", default_value = DEFAULT_COLLECTION)]
        collection: String,
        /// FTS5 tokenizer used when the table is created.
        #[arg(long, env = "FTS_INGEST_TOKENIZER", default_value = DEFAULT_TOKENIZER)]
        tokenizer: String,
        /// bm25 weights for title,source_path,content,tag.
        #[arg(long, value_delimiter = ',')]
        rank_weights: Option<Vec<f64>>,
    },
    /// Ranked full-text search over an existing collection.
    Search {
        /// SQLite database file.
        #[arg(long, env = "FTS_INGEST_DB")]
        db: PathBuf,
        /// FTS5 query; empty lists rows.
        #[arg(long, default_value = "")]
        query: String,
        /// Number of hits to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Full-text table name.
        #[arg(long, env = "FTS_INGEST_COLLECTION", default_value = DEFAULT_COLLECTION)]
        collection: String,
        /// Print hits as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "fts-ingest boot"
    );

    match cli.command {
        Command::Ingest {
            db,
            root,
            batch_size,
            max_files,
            limit_bytes,
            tag,
            collection,
            tokenizer,
            rank_weights,
        } => {
            let rank_weights = match rank_weights {
                Some(weights) => {
                    ensure!(
                        weights.len() == 4,
                        "--rank-weights takes exactly four values, got {}",
                        weights.len()
                    );
                    RankWeights::new(weights[0], weights[1], weights[2], weights[3])?
                }
                None => RankWeights::default(),
            };

            let options = IngestionOptions {
                batch_size,
                max_files,
                limit_bytes,
                tag,
                rank_weights,
            };
            let config = StoreConfig {
                collection,
                tokenizer,
                ..Default::default()
            };

            let report = IngestCoordinator::new(options)
                .run(&root, &db, &config)
                .with_context(|| format!("ingestion into {} failed", db.display()))?;

            for failure in &report.maintenance.failures {
                warn!(%failure, "index maintenance incomplete");
            }
            if report.read_failures > 0 {
                println!(
                    "{} file(s) could not be read and were stored with an error placeholder",
                    report.read_failures
                );
            }
            println!(
                "done: processed {} files, inserted {} records in {:.1}s",
                report.total,
                report.inserted,
                report.elapsed.as_secs_f64()
            );
        }
        Command::Search {
            db,
            query,
            top_k,
            collection,
            json,
        } => {
            if !db.is_file() {
                bail!("database not found: {}", db.display());
            }

            let store = SqliteStore::open_existing(&db, &collection)?;
            let hits = search(&store, &SearchQuery { text: query, top_k })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for hit in &hits {
                    println!("[{}] score={:.4} {}", hit.rowid, hit.score, hit.title);
                    println!("  source={}", hit.source_path);
                    println!("  {}", hit.snippet.replace('\n', " "));
                }
                if hits.is_empty() {
                    println!("no matches");
                }
            }
            store.close()?;
        }
    }

    Ok(())
}
