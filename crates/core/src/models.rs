use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::IngestError;

pub const DEFAULT_BATCH_SIZE: usize = 500;

pub const DEFAULT_TOP_K: usize = 10;

/// Annotation attached to every record when the caller does not supply one.
pub const DEFAULT_TAG: &str = "Lorem Ipsum is simply dummy text of the printing and typesetting industry. \
Lorem Ipsum has been the industry's standard dummy text ever since the 1500s, \
when an unknown printer took a galley of type and scrambled it to make a type specimen book. \
It has survived not.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub source_path: String,
    pub content: String,
    pub tag: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Per-column bm25 weights, in collection column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankWeights {
    pub title: f64,
    pub source_path: f64,
    pub content: f64,
    pub tag: f64,
}

impl RankWeights {
    pub fn new(title: f64, source_path: f64, content: f64, tag: f64) -> Result<Self, IngestError> {
        let weights = Self {
            title,
            source_path,
            content,
            tag,
        };

        if weights.as_array().iter().any(|weight| !weight.is_finite()) {
            return Err(IngestError::InvalidArgument(format!(
                "rank weights must be finite numbers, got {weights:?}"
            )));
        }

        Ok(weights)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.title, self.source_path, self.content, self.tag]
    }

    /// Rank expression understood by FTS5, e.g. `bm25(10.0, 5.0, 8.0, 2.0)`.
    /// FTS5 does not parse exponents, so weights are always written as plain
    /// decimals.
    pub fn to_bm25(&self) -> String {
        let args = self
            .as_array()
            .iter()
            .map(|weight| decimal(*weight))
            .collect::<Vec<_>>()
            .join(", ");
        format!("bm25({args})")
    }
}

fn decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            title: 10.0,
            source_path: 5.0,
            content: 8.0,
            tag: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub batch_size: usize,
    pub max_files: Option<usize>,
    pub limit_bytes: Option<u64>,
    pub tag: String,
    pub rank_weights: RankWeights,
}

impl IngestionOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_files: None,
            limit_bytes: None,
            tag: DEFAULT_TAG.to_string(),
            rank_weights: RankWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceStep {
    SetRank,
    Rebuild,
    Optimize,
}

impl MaintenanceStep {
    pub const ORDER: [MaintenanceStep; 3] = [Self::SetRank, Self::Rebuild, Self::Optimize];
}

impl fmt::Display for MaintenanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetRank => "rank",
            Self::Rebuild => "rebuild",
            Self::Optimize => "optimize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct MaintenanceReport {
    pub completed: Vec<MaintenanceStep>,
    pub failures: Vec<IngestError>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    /// Files observed, including those whose read failed.
    pub total: usize,
    /// Records durably committed.
    pub inserted: usize,
    pub batches: usize,
    pub read_failures: usize,
    pub elapsed: Duration,
    pub maintenance: MaintenanceReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub rowid: i64,
    pub title: String,
    pub source_path: String,
    pub tag: String,
    pub snippet: String,
    pub score: f64,
}
