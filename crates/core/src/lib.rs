pub mod batch;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod orchestrator;
pub mod record;
pub mod scanner;
pub mod search;
pub mod store;
pub mod traits;

pub use batch::BatchWriter;
pub use error::{FileReadFailure, IngestError, Result, SearchError};
pub use maintenance::IndexMaintainer;
pub use models::{
    IngestionOptions, IngestionReport, MaintenanceReport, MaintenanceStep, RankWeights, Record,
    SearchHit, SearchQuery, DEFAULT_BATCH_SIZE, DEFAULT_TAG, DEFAULT_TOP_K,
};
pub use orchestrator::IngestCoordinator;
pub use record::{decode_lossy, BuiltRecord, RecordBuilder};
pub use scanner::FileScanner;
pub use search::search;
pub use store::{PragmaConfig, SqliteStore, StoreConfig, DEFAULT_COLLECTION, DEFAULT_TOKENIZER};
pub use traits::FullTextCollection;
