//! Cell text resolution.
//!
//! Resolvers run once per visible row per redraw. A resolver that finds nothing
//! to show returns `Ok(None)`; a resolver that fails (error or panic) only poisons
//! its own cell, never the row or the listing.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::collection::{Card, Collection, Note};
use crate::error::AppError;
use crate::registry::ColumnRegistry;

/// Everything a resolver may look at for one cell.
pub struct RowContext<'a> {
    pub collection: &'a Collection,
    pub card: &'a Card,
    pub note: &'a Note,
    /// Passed through so one resolver can serve a family of columns
    /// (e.g. every `_field_<name>` column).
    pub column_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellText {
    Empty,
    Text(String),
    /// Resolution failed; holds the inline error marker.
    Fault(String),
}

impl CellText {
    pub fn as_str(&self) -> &str {
        match self {
            CellText::Empty => "",
            CellText::Text(s) | CellText::Fault(s) => s,
        }
    }

    pub fn is_fault(&self) -> bool { matches!(self, CellText::Fault(_)) }

    fn from_value(v: Option<String>) -> Self {
        match v {
            Some(s) if !s.is_empty() => CellText::Text(s),
            _ => CellText::Empty,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "resolver panicked".to_string()
    }
}

/// Cell text for `ctx.column_id`. Columns without a resolver (or unknown ids)
/// render empty; the host fills those itself.
pub fn resolve(registry: &ColumnRegistry, ctx: &RowContext<'_>) -> CellText {
    let Some(f) = registry.get(ctx.column_id).and_then(|d| d.resolve_fn()) else {
        return CellText::Empty;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
        Ok(Ok(v)) => CellText::from_value(v),
        Ok(Err(e)) => {
            warn!(target: "browsecol::resolve", "column '{}' card {}: {}", ctx.column_id, ctx.card.id, e);
            CellText::Fault(e.cell_marker())
        }
        Err(payload) => {
            let e = AppError::internal("resolver_panic", panic_message(payload.as_ref()));
            warn!(target: "browsecol::resolve", "column '{}' card {} panicked: {}", ctx.column_id, ctx.card.id, e);
            CellText::Fault(e.cell_marker())
        }
    }
}

/// Fill the cells of one row. If the card or its note cannot be loaded, every
/// column with a resolver shows the fault and the rest stay empty.
pub fn resolve_row<S: AsRef<str>>(collection: &Collection, registry: &ColumnRegistry, card_id: i64, columns: &[S]) -> Vec<CellText> {
    let loaded = collection.card(card_id).and_then(|card| {
        let note = collection.note(card.nid)?;
        Ok((card, note))
    });
    match loaded {
        Ok((card, note)) => columns
            .iter()
            .map(|id| {
                let ctx = RowContext { collection, card: &card, note: &note, column_id: id.as_ref() };
                resolve(registry, &ctx)
            })
            .collect(),
        Err(e) => {
            warn!(target: "browsecol::resolve", "row for card {} unavailable: {}", card_id, e);
            let marker = e.cell_marker();
            columns
                .iter()
                .map(|id| match registry.get(id.as_ref()) {
                    Some(d) if d.has_resolver() => CellText::Fault(marker.clone()),
                    _ => CellText::Empty,
                })
                .collect()
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod resolve_tests;
