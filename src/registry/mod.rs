// Column registry: one instance per browser session, populated by contributors.

use std::collections::HashMap;

use tracing::debug;

pub mod descriptor;

pub use descriptor::{Collation, ColumnDescriptor, SideTableSource, SortSource, SortSpec};

#[derive(Clone, Default)]
pub struct ColumnRegistry {
    columns: HashMap<String, ColumnDescriptor>,
}

impl ColumnRegistry {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace the descriptor at its id. Returns the replaced one.
    pub fn register(&mut self, descriptor: ColumnDescriptor) -> Option<ColumnDescriptor> {
        let prev = self.columns.insert(descriptor.id().to_string(), descriptor);
        if let Some(p) = &prev {
            debug!(target: "browsecol::registry", "column '{}' re-registered", p.id());
        }
        prev
    }

    pub fn remove(&mut self, id: &str) -> Option<ColumnDescriptor> {
        self.columns.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(id)
    }

    pub fn contains(&self, id: &str) -> bool { self.columns.contains_key(id) }

    /// Every descriptor, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    /// Descriptors ordered for display: by label, then id.
    pub fn sorted(&self) -> Vec<&ColumnDescriptor> {
        let mut v: Vec<&ColumnDescriptor> = self.columns.values().collect();
        v.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.id().cmp(b.id())));
        v
    }

    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}
