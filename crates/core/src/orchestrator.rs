use crate::batch::BatchWriter;
use crate::error::IngestError;
use crate::maintenance::IndexMaintainer;
use crate::models::{IngestionOptions, IngestionReport};
use crate::record::RecordBuilder;
use crate::scanner::FileScanner;
use crate::store::{SqliteStore, StoreConfig};
use crate::traits::FullTextCollection;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Drives scan, build and batched writes, then index maintenance.
pub struct IngestCoordinator {
    options: IngestionOptions,
    builder: RecordBuilder,
    maintainer: IndexMaintainer,
}

impl IngestCoordinator {
    pub fn new(options: IngestionOptions) -> Self {
        let builder = RecordBuilder::new(options.tag.clone(), options.limit_bytes);
        let maintainer = IndexMaintainer::new(options.rank_weights);
        Self {
            options,
            builder,
            maintainer,
        }
    }

    /// Full run against a SQLite store. The root is validated before the
    /// store is touched, so a bad root never creates a database file.
    pub fn run(
        &self,
        root: &Path,
        db_path: &Path,
        config: &StoreConfig,
    ) -> Result<IngestionReport, IngestError> {
        self.options.validate()?;
        let scanner = FileScanner::new(root)?;
        let mut store = SqliteStore::open(db_path, config)?;

        // on error the store is dropped here, which closes the connection
        let report = self.ingest(scanner, &mut store)?;

        if let Err(error) = store.close() {
            warn!(%error, "closing store failed after a completed run");
        }
        Ok(report)
    }

    pub fn ingest<S, I>(&self, files: I, store: &mut S) -> Result<IngestionReport, IngestError>
    where
        S: FullTextCollection,
        I: IntoIterator<Item = std::path::PathBuf>,
    {
        let started = Instant::now();
        info!(started_at = %Utc::now().to_rfc3339(), batch_size = self.options.batch_size, "ingestion started");

        let mut report = IngestionReport::default();
        let mut writer = BatchWriter::new(store, self.options.batch_size)?;

        for path in files {
            if self
                .options
                .max_files
                .is_some_and(|max_files| report.total >= max_files)
            {
                info!(max_files = report.total, "file limit reached");
                break;
            }
            report.total += 1;

            let built = self.builder.build(&path);
            if built.read_failure.is_some() {
                report.read_failures += 1;
            }

            if let Some(size) = writer.push(built.record)? {
                info!(
                    batch = size,
                    inserted = writer.inserted(),
                    processed = report.total,
                    "batch committed"
                );
            }
        }

        if let Some(size) = writer.finish()? {
            info!(
                batch = size,
                inserted = writer.inserted(),
                processed = report.total,
                "final batch committed"
            );
        }

        report.inserted = writer.inserted();
        report.batches = writer.batches();
        report.maintenance = self.maintainer.run(store);
        report.elapsed = started.elapsed();

        info!(
            total = report.total,
            inserted = report.inserted,
            read_failures = report.read_failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ingestion finished"
        );

        Ok(report)
    }
}
