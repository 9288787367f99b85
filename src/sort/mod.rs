//!
//! browsecol sort compiler
//! -----------------------
//! Turns a column's sort spec into something the card query can order by.
//!
//! - `plan`: decides between no plan, an inline order-by expression and a
//!   materialized side-table plus lookup expression.
//! - `clause`: the ordering policy (blanks last, collation, numeric-aware keys).
//! - `side_table`: drop-and-recreate of the temporary `sort_side` table.
//! - `search`: runs a filtered search and returns ordered card ids.

pub mod clause;
pub mod plan;
pub mod search;
pub mod side_table;

pub use plan::{plan_sort, SideTableBuild, SortPlan};
pub use search::{default_order, search, SearchScope, SortDirection};
