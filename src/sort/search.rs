use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collection::Collection;
use crate::error::AppResult;
use crate::registry::ColumnRegistry;
use crate::tprintln;

use super::clause;
use super::plan::{plan_sort, SortPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// The host's row filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchScope {
    #[default]
    All,
    /// Cards currently in the deck, or borrowed from it by a filtered deck.
    Deck(i64),
    NoteType(i64),
    Cards(Vec<i64>),
    /// Raw predicate over `c` and `n` with positional `?` parameters.
    Predicate { sql: String, params: Vec<Value> },
}

impl SearchScope {
    pub fn predicate(sql: impl Into<String>) -> Self {
        SearchScope::Predicate { sql: sql.into(), params: Vec::new() }
    }

    /// WHERE body and its parameters.
    pub fn where_clause(&self) -> (String, Vec<Value>) {
        match self {
            SearchScope::All => ("1".to_string(), Vec::new()),
            SearchScope::Deck(did) => ("(c.did = ? OR c.odid = ?)".to_string(), vec![Value::Integer(*did), Value::Integer(*did)]),
            SearchScope::NoteType(mid) => ("n.mid = ?".to_string(), vec![Value::Integer(*mid)]),
            SearchScope::Cards(ids) if ids.is_empty() => ("0".to_string(), Vec::new()),
            // One JSON array parameter, so the list size is not bound by SQLite's variable limit.
            SearchScope::Cards(ids) => {
                let list = serde_json::Value::from(ids.clone()).to_string();
                ("c.id IN (SELECT value FROM json_each(?))".to_string(), vec![Value::Text(list)])
            }
            SearchScope::Predicate { sql, params } => (format!("({})", sql), params.clone()),
        }
    }
}

pub(crate) fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

/// Reverse the non-blank prefix of an ascending result, keeping the blank tail.
pub(crate) fn apply_direction(rows: Vec<(i64, Value)>, direction: SortDirection) -> Vec<i64> {
    let mut ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
    if direction == SortDirection::Descending {
        let split = rows.iter().position(|(_, v)| is_blank(v)).unwrap_or(rows.len());
        ids[..split].reverse();
    }
    ids
}

/// Card ids in default order (card id, in `direction`).
pub fn default_order(collection: &Collection, scope: &SearchScope, direction: SortDirection) -> AppResult<Vec<i64>> {
    let (predicate, params) = scope.where_clause();
    let mut stmt = collection.conn().prepare(&clause::default_query(&predicate))?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |r| r.get::<_, i64>(0))?;
    let mut ids = Vec::new();
    for id in rows { ids.push(id?); }
    if direction == SortDirection::Descending {
        ids.reverse();
    }
    Ok(ids)
}

/// Run a planned ascending query and fetch `(card id, sort value)` pairs.
pub fn ordered_rows(collection: &Collection, plan: &SortPlan, scope: &SearchScope) -> AppResult<Vec<(i64, Value)>> {
    let (expr, collation, numeric_aware) = match plan {
        SortPlan::None => return Ok(Vec::new()),
        SortPlan::Inline { expr, collation, numeric_aware } => (expr, *collation, *numeric_aware),
        SortPlan::Materialized { build, expr, collation, numeric_aware } => {
            build.run(collection, scope)?;
            (expr, *collation, *numeric_aware)
        }
    };
    let (predicate, params) = scope.where_clause();
    let sql = clause::ordered_query(expr, &predicate, collation, numeric_aware);
    tprintln!("sorted search sql: {}", sql);
    let mut stmt = collection.conn().prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Value>(1)?)))?;
    let mut out = Vec::new();
    for r in rows { out.push(r?); }
    Ok(out)
}

/// Filter by `scope` and order by `sort` (column id and direction). Unknown or
/// unsortable columns fall back to default order.
pub fn search(
    collection: &Collection,
    registry: &ColumnRegistry,
    scope: &SearchScope,
    sort: Option<(&str, SortDirection)>,
) -> AppResult<Vec<i64>> {
    let Some((column_id, direction)) = sort else {
        return default_order(collection, scope, SortDirection::Ascending);
    };
    let plan = plan_sort(registry, column_id);
    if !plan.is_sortable() {
        return default_order(collection, scope, direction);
    }
    let rows = ordered_rows(collection, &plan, scope)?;
    info!(
        target: "browsecol::search",
        "sorted {} cards by '{}' ({:?}{})",
        rows.len(),
        column_id,
        direction,
        if plan.is_materialized() { ", materialized" } else { "" }
    );
    let ids = apply_direction(rows, direction);
    debug!(target: "browsecol::search", "first ids: {:?}", &ids[..ids.len().min(5)]);
    Ok(ids)
}
