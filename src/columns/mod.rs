//! Built-in column sets.
//!
//! Each set is a `ColumnContributor`: on every browser load it registers its
//! descriptors (with menu placement) into the session's fresh registry, and may
//! ask for columns registered by others to be removed once loading finishes.

use rusqlite::types::Value;

use crate::collection::Collection;
use crate::config::EffectiveConfig;
use crate::error::AppResult;
use crate::registry::{ColumnDescriptor, ColumnRegistry};
use crate::resolve::RowContext;

pub mod advanced;
pub mod basic;
pub mod internal;
pub mod note_fields;

pub use advanced::AdvancedColumns;
pub use basic::BasicColumns;
pub use internal::InternalColumns;
pub use note_fields::NoteFieldColumns;

/// What a contributor sees while the session loads.
pub struct LoadContext<'a> {
    pub collection: &'a Collection,
    pub config: &'a EffectiveConfig,
    registry: &'a mut ColumnRegistry,
    removals: Vec<String>,
}

impl<'a> LoadContext<'a> {
    pub fn new(collection: &'a Collection, config: &'a EffectiveConfig, registry: &'a mut ColumnRegistry) -> Self {
        Self { collection, config, registry, removals: Vec::new() }
    }

    pub fn register(&mut self, descriptor: ColumnDescriptor) {
        self.registry.register(descriptor);
    }

    /// Remove `id` after every contributor has run, whoever registers it.
    pub fn request_removal(&mut self, id: impl Into<String>) {
        self.removals.push(id.into());
    }

    pub fn registry(&self) -> &ColumnRegistry { self.registry }

    /// Apply the collected removals; returns how many columns were dropped.
    pub fn finish(self) -> usize {
        let registry = self.registry;
        self.removals.iter().filter(|id| registry.remove(id).is_some()).count()
    }
}

pub trait ColumnContributor {
    fn name(&self) -> &str;
    fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()>;
}

/// The stock contributors, in load order.
pub fn builtin_contributors() -> Vec<Box<dyn ColumnContributor>> {
    vec![Box::new(BasicColumns), Box::new(AdvancedColumns), Box::new(NoteFieldColumns), Box::new(InternalColumns)]
}

// --- helpers for resolvers ---

fn scalar_i64(ctx: &RowContext<'_>, sql: &str) -> AppResult<Option<i64>> {
    Ok(ctx.collection.scalar_for_card(sql, ctx.card.id)?.and_then(|v| match v {
        Value::Integer(i) => Some(i),
        Value::Real(f) => Some(f as i64),
        _ => None,
    }))
}

fn scalar_f64(ctx: &RowContext<'_>, sql: &str) -> AppResult<Option<f64>> {
    Ok(ctx.collection.scalar_for_card(sql, ctx.card.id)?.and_then(|v| match v {
        Value::Integer(i) => Some(i as f64),
        Value::Real(f) => Some(f),
        _ => None,
    }))
}

#[cfg(test)]
#[path = "columns_tests.rs"]
mod columns_tests;
