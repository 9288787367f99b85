//! Column picker menu.
//!
//! Placement is decided by each contributor on its descriptors; this module only
//! arranges them. Every level is sorted by display name with ties broken by column
//! id (groups, which have no id, sort before leaves of the same name), so the
//! same registry always yields the same tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::registry::ColumnRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuNode {
    Group { name: String, children: Vec<MenuNode> },
    Column { label: String, id: String },
}

impl MenuNode {
    pub fn name(&self) -> &str {
        match self {
            MenuNode::Group { name, .. } => name,
            MenuNode::Column { label, .. } => label,
        }
    }

    fn sort_key(&self) -> (&str, u8, &str) {
        match self {
            MenuNode::Group { name, .. } => (name, 0, ""),
            MenuNode::Column { label, id } => (label, 1, id),
        }
    }

    /// Column ids in menu order, depth first.
    pub fn column_ids(&self) -> Vec<&str> {
        match self {
            MenuNode::Column { id, .. } => vec![id.as_str()],
            MenuNode::Group { children, .. } => children.iter().flat_map(|c| c.column_ids()).collect(),
        }
    }
}

#[derive(Default)]
struct Level {
    groups: BTreeMap<String, Level>,
    // (label, id); a column placed twice in one group is listed once.
    leaves: BTreeSet<(String, String)>,
}

impl Level {
    fn insert(&mut self, path: &[String], label: &str, id: &str) {
        match path.split_first() {
            None => {
                self.leaves.insert((label.to_string(), id.to_string()));
            }
            Some((head, rest)) => self.groups.entry(head.clone()).or_default().insert(rest, label, id),
        }
    }

    fn into_nodes(self) -> Vec<MenuNode> {
        let mut nodes: Vec<MenuNode> = self
            .groups
            .into_iter()
            .map(|(name, level)| MenuNode::Group { name, children: level.into_nodes() })
            .chain(self.leaves.into_iter().map(|(label, id)| MenuNode::Column { label, id }))
            .collect();
        nodes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        nodes
    }
}

/// Build the menu tree for every registered column.
pub fn project(registry: &ColumnRegistry) -> Vec<MenuNode> {
    let mut root = Level::default();
    for d in registry.all() {
        if d.placements().is_empty() {
            root.insert(&[], d.label(), d.id());
        }
        for path in d.placements() {
            root.insert(path, d.label(), d.id());
        }
    }
    root.into_nodes()
}

#[cfg(test)]
#[path = "menu_tests.rs"]
mod menu_tests;
