// Temporary side-table holding precomputed sort values.
//
// One table per connection, replaced wholesale on every build: rows from an
// earlier search never survive into the next one.

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::debug;

use crate::collection::Collection;
use crate::error::AppResult;
use crate::registry::SideTableSource;

use super::clause::CARD_SOURCE;
use super::search::SearchScope;

pub const SIDE_TABLE: &str = "temp.sort_side";

pub fn rebuild(collection: &Collection, source: &SideTableSource, scope: &SearchScope) -> AppResult<usize> {
    collection.transact(|col| {
        let conn = col.conn();
        conn.execute_batch(
            "DROP TABLE IF EXISTS temp.sort_side;
             CREATE TEMP TABLE sort_side (k INTEGER PRIMARY KEY, v);",
        )?;
        let rows = match source {
            SideTableSource::PerRow { value_expr } => {
                let (predicate, params) = scope.where_clause();
                let sql = format!(
                    "INSERT INTO temp.sort_side (k, v) SELECT c.id, ({}) FROM {} WHERE {}",
                    value_expr, CARD_SOURCE, predicate
                );
                conn.execute(&sql, params_from_iter(params.iter()))?
            }
            SideTableSource::Keyed { query, .. } => {
                let sql = format!("INSERT OR REPLACE INTO temp.sort_side (k, v) SELECT * FROM ({})", query);
                conn.execute(&sql, [])?
            }
            SideTableSource::Computed { rows, .. } => {
                let computed = rows(col)?;
                let mut stmt = conn.prepare("INSERT OR REPLACE INTO temp.sort_side (k, v) VALUES (?1, ?2)")?;
                for (k, v) in &computed {
                    stmt.execute(rusqlite::params![k, v])?;
                }
                computed.len()
            }
        };
        debug!(target: "browsecol::search", "side-table rebuilt with {} rows ({:?})", rows, source);
        Ok(rows)
    })
}

/// Current side-table contents ordered by key.
pub fn contents(collection: &Collection) -> AppResult<Vec<(i64, Value)>> {
    let mut stmt = collection.conn().prepare("SELECT k, v FROM temp.sort_side ORDER BY k")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Value>(1)?)))?;
    let mut out = Vec::new();
    for r in rows { out.push(r?); }
    Ok(out)
}
