use tracing::debug;

use crate::collection::Collection;
use crate::error::AppResult;
use crate::registry::{Collation, ColumnRegistry, SideTableSource, SortSource};

use super::search::SearchScope;
use super::side_table;

/// Rebuilds the side-table for one materialized column.
#[derive(Clone, Debug)]
pub struct SideTableBuild {
    source: SideTableSource,
}

impl SideTableBuild {
    pub fn source(&self) -> &SideTableSource { &self.source }

    /// Drop and repopulate `sort_side`. Per-row sources are restricted to
    /// `scope`; keyed and computed sources cover their whole key space.
    pub fn run(&self, collection: &Collection, scope: &SearchScope) -> AppResult<usize> {
        side_table::rebuild(collection, &self.source, scope)
    }
}

#[derive(Clone, Debug)]
pub enum SortPlan {
    /// Not sortable; callers use default order.
    None,
    Inline { expr: String, collation: Collation, numeric_aware: bool },
    /// `build` must run before the ordered query; `expr` reads the side-table.
    Materialized { build: SideTableBuild, expr: String, collation: Collation, numeric_aware: bool },
}

impl SortPlan {
    pub fn expr(&self) -> Option<&str> {
        match self {
            SortPlan::None => None,
            SortPlan::Inline { expr, .. } | SortPlan::Materialized { expr, .. } => Some(expr),
        }
    }

    pub fn is_sortable(&self) -> bool { !matches!(self, SortPlan::None) }

    pub fn is_materialized(&self) -> bool { matches!(self, SortPlan::Materialized { .. }) }
}

/// Expression that looks a card's value up in the side-table.
pub fn side_table_lookup(source: &SideTableSource) -> String {
    format!("(SELECT v FROM {} WHERE k = {})", side_table::SIDE_TABLE, source.key_expr())
}

pub fn plan_sort(registry: &ColumnRegistry, column_id: &str) -> SortPlan {
    let Some(spec) = registry.get(column_id).and_then(|d| d.sort_spec()) else {
        debug!(target: "browsecol::search", "column '{}' has no sort plan", column_id);
        return SortPlan::None;
    };
    match &spec.source {
        SortSource::Inline(expr) => {
            SortPlan::Inline { expr: expr.clone(), collation: spec.collation, numeric_aware: spec.numeric_aware }
        }
        SortSource::Materialized(source) => SortPlan::Materialized {
            build: SideTableBuild { source: source.clone() },
            expr: side_table_lookup(source),
            collation: spec.collation,
            numeric_aware: spec.numeric_aware,
        },
    }
}
