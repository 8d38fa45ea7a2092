use crate::error::SearchError;
use crate::models::{SearchHit, SearchQuery};
use crate::store::SqliteStore;
use rusqlite::params;

const SNIPPET_TOKENS: usize = 16;

/// Ranked full-text lookup over live (not soft-deleted) rows.
///
/// The query text uses FTS5 syntax (`AND`, `OR`, `"phrases"`, `prefix*`,
/// `column:term`). An empty query lists live rows in insertion order.
pub fn search(store: &SqliteStore, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
    if query.top_k == 0 {
        return Err(SearchError::Request("top_k must be at least 1".to_string()));
    }

    let collection = store.collection();
    let text = query.text.trim();
    let limit = i64::try_from(query.top_k).unwrap_or(i64::MAX);
    let conn = store.connection();

    let hits = if text.is_empty() {
        let sql = format!(
            "SELECT rowid, title, source_path, tag, substr(content, 1, 200), 0.0
             FROM {collection}
             WHERE deleted_at IS NULL
             ORDER BY rowid
             LIMIT ?1"
        );
        let mut statement = conn.prepare(&sql)?;
        let rows = statement.query_map(params![limit], read_hit)?;
        rows.collect::<Result<Vec<_>, _>>()?
    } else {
        let sql = format!(
            "SELECT rowid, title, source_path, tag,
                    snippet({collection}, 2, '[', ']', '...', {SNIPPET_TOKENS}), rank
             FROM {collection}
             WHERE deleted_at IS NULL AND {collection} MATCH ?1
             ORDER BY rank
             LIMIT ?2"
        );
        let mut statement = conn.prepare(&sql)?;
        let rows = statement.query_map(params![text, limit], read_hit)?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    Ok(hits)
}

fn read_hit(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchHit> {
    Ok(SearchHit {
        rowid: row.get(0)?,
        title: row.get(1)?,
        source_path: row.get(2)?,
        tag: row.get(3)?,
        snippet: row.get(4)?,
        score: row.get(5)?,
    })
}
