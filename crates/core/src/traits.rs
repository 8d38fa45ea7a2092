use crate::models::{RankWeights, Record};

/// Write side of a full-text collection.
///
/// `insert_batch` must be all-or-nothing: either every record becomes visible
/// or none does. The administrative commands are not tied to any data
/// transaction.
pub trait FullTextCollection {
    fn insert_batch(&mut self, records: &[Record]) -> rusqlite::Result<()>;

    fn set_rank(&mut self, weights: &RankWeights) -> rusqlite::Result<()>;

    fn rebuild(&mut self) -> rusqlite::Result<()>;

    fn optimize(&mut self) -> rusqlite::Result<()>;
}
