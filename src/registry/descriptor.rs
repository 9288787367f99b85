//! Column descriptors: the static definition of one virtual browser column.
//!
//! A descriptor carries up to three optional capabilities (a resolver for cell
//! text, a sort spec, a writer for edited values) plus its menu placement. Callers
//! branch on `has_resolver` / `is_sortable` / `has_writer` instead of probing.

use std::fmt;
use std::sync::Arc;

use rusqlite::types::Value;

use crate::collection::Collection;
use crate::error::AppResult;
use crate::mutate::WriteContext;
use crate::resolve::RowContext;

pub type ResolveFn = Arc<dyn Fn(&RowContext<'_>) -> AppResult<Option<String>> + Send + Sync>;
pub type WriteFn = Arc<dyn Fn(&WriteContext<'_>, &str) -> AppResult<()> + Send + Sync>;
pub type RowsFn = Arc<dyn Fn(&Collection) -> AppResult<Vec<(i64, Value)>> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Collation {
    /// Case-insensitive text comparison.
    #[default]
    NoCase,
    Binary,
}

/// Where the rows of a materialized side-table come from.
#[derive(Clone)]
pub enum SideTableSource {
    /// One row per card matching the current search; `value_expr` is evaluated
    /// with `c` (cards) and `n` (notes) in scope and keyed by card id.
    PerRow { value_expr: String },
    /// Rows from a search-independent query returning `(k, v)`, looked up by
    /// `key_expr` (e.g. `c.did` against one row per deck).
    Keyed { key_expr: String, query: String },
    /// Rows computed in Rust, looked up by `key_expr`.
    Computed { key_expr: String, rows: RowsFn },
}

impl SideTableSource {
    /// Expression the card row uses to reach its side-table key.
    pub fn key_expr(&self) -> &str {
        match self {
            SideTableSource::PerRow { .. } => "c.id",
            SideTableSource::Keyed { key_expr, .. } | SideTableSource::Computed { key_expr, .. } => key_expr,
        }
    }
}

impl fmt::Debug for SideTableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideTableSource::PerRow { value_expr } => f.debug_struct("PerRow").field("value_expr", value_expr).finish(),
            SideTableSource::Keyed { key_expr, query } => {
                f.debug_struct("Keyed").field("key_expr", key_expr).field("query", query).finish()
            }
            SideTableSource::Computed { key_expr, .. } => f.debug_struct("Computed").field("key_expr", key_expr).finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum SortSource {
    /// Order-by fragment over `c`/`n`, cheap enough to evaluate per comparison.
    Inline(String),
    /// Precompute into the side-table before the ordered query runs.
    Materialized(SideTableSource),
}

#[derive(Clone, Debug)]
pub struct SortSpec {
    pub source: SortSource,
    pub collation: Collation,
    /// Numeric-looking text sorts by value ("9" < "10").
    pub numeric_aware: bool,
}

impl SortSpec {
    pub fn inline(expr: impl Into<String>) -> Self {
        Self { source: SortSource::Inline(expr.into()), collation: Collation::NoCase, numeric_aware: true }
    }

    pub fn per_row(value_expr: impl Into<String>) -> Self {
        Self::materialized(SideTableSource::PerRow { value_expr: value_expr.into() })
    }

    pub fn keyed(key_expr: impl Into<String>, query: impl Into<String>) -> Self {
        Self::materialized(SideTableSource::Keyed { key_expr: key_expr.into(), query: query.into() })
    }

    pub fn computed<F>(key_expr: impl Into<String>, rows: F) -> Self
    where
        F: Fn(&Collection) -> AppResult<Vec<(i64, Value)>> + Send + Sync + 'static,
    {
        Self::materialized(SideTableSource::Computed { key_expr: key_expr.into(), rows: Arc::new(rows) })
    }

    fn materialized(src: SideTableSource) -> Self {
        Self { source: SortSource::Materialized(src), collation: Collation::NoCase, numeric_aware: true }
    }

    pub fn binary(mut self) -> Self {
        self.collation = Collation::Binary;
        self
    }

    pub fn lexical(mut self) -> Self {
        self.numeric_aware = false;
        self
    }

    pub fn needs_materialization(&self) -> bool {
        matches!(self.source, SortSource::Materialized(_))
    }
}

#[derive(Clone)]
pub struct ColumnDescriptor {
    id: String,
    label: String,
    resolver: Option<ResolveFn>,
    sort: Option<SortSpec>,
    writer: Option<WriteFn>,
    /// Menu group paths this column is listed under; empty means top level.
    placements: Vec<Vec<String>>,
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into(), resolver: None, sort: None, writer: None, placements: Vec::new() }
    }

    pub fn resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(&RowContext<'_>) -> AppResult<Option<String>> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(f));
        self
    }

    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort = Some(spec);
        self
    }

    pub fn writer<F>(mut self, f: F) -> Self
    where
        F: Fn(&WriteContext<'_>, &str) -> AppResult<()> + Send + Sync + 'static,
    {
        self.writer = Some(Arc::new(f));
        self
    }

    /// List under the group path `path` (outermost first). May be called more
    /// than once to list the column in several groups.
    pub fn in_group<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.placements.push(path.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn label(&self) -> &str { &self.label }
    pub fn placements(&self) -> &[Vec<String>] { &self.placements }
    pub fn sort_spec(&self) -> Option<&SortSpec> { self.sort.as_ref() }
    pub fn resolve_fn(&self) -> Option<&ResolveFn> { self.resolver.as_ref() }
    pub fn write_fn(&self) -> Option<&WriteFn> { self.writer.as_ref() }

    pub fn has_resolver(&self) -> bool { self.resolver.is_some() }
    pub fn is_sortable(&self) -> bool { self.sort.is_some() }
    pub fn has_writer(&self) -> bool { self.writer.is_some() }
    pub fn needs_materialization(&self) -> bool { self.sort.as_ref().map(|s| s.needs_materialization()).unwrap_or(false) }
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("has_resolver", &self.has_resolver())
            .field("sort", &self.sort)
            .field("has_writer", &self.has_writer())
            .field("placements", &self.placements)
            .finish()
    }
}
