//!
//! browsecol browser session
//! -------------------------
//! One `BrowserSession` exists per browser open. It owns a fresh column registry
//! populated by the contributors, plus the host's persisted view state (active
//! columns, sort column and direction), and routes every host request (cells,
//! sorted searches, edits, the column menu) to the right module.
//!
//! Nothing here fails the host loop: a contributor that errors is skipped, a sort
//! that cannot run falls back to card order, and cell faults come back as text.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::columns::{ColumnContributor, LoadContext};
use crate::config::EffectiveConfig;
use crate::error::{AppError, AppResult};
use crate::menu::{self, MenuNode};
use crate::mutate::{self, Confirm, WriteOutcome};
use crate::registry::{ColumnDescriptor, ColumnRegistry};
use crate::resolve::{resolve_row, CellText};
use crate::sort::{self, SearchScope, SortDirection, SortPlan};

/// View state the host persists between opens, keyed by `EffectiveConfig::state_key`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserState {
    pub active_columns: Vec<String>,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
}

impl BrowserState {
    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|e| AppError::internal("state_encode", e.to_string()))
    }

    /// Unreadable state is not an error; the browser opens with defaults.
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|e| {
            warn!(target: "browsecol::session", "discarding unreadable browser state: {}", e);
            Self::default()
        })
    }
}

pub struct BrowserSession<'a> {
    collection: &'a Collection,
    config: EffectiveConfig,
    registry: ColumnRegistry,
    state: BrowserState,
}

impl<'a> BrowserSession<'a> {
    /// Build the registry: every contributor in order, then the removals they asked for.
    pub fn open(collection: &'a Collection, config: EffectiveConfig, contributors: &[Box<dyn ColumnContributor>]) -> Self {
        let mut registry = ColumnRegistry::new();
        let removed = {
            let mut ctx = LoadContext::new(collection, &config, &mut registry);
            for c in contributors {
                if let Err(e) = c.contribute(&mut ctx) {
                    warn!(target: "browsecol::session", "contributor '{}' failed: {}", c.name(), e);
                }
            }
            ctx.finish()
        };
        info!(
            target: "browsecol::session",
            "session loaded {} columns from {} contributors ({} removed)",
            registry.len(),
            contributors.len(),
            removed
        );
        Self { collection, config, registry, state: BrowserState::default() }
    }

    /// Adopt persisted state, dropping active or sort columns this session does not have.
    pub fn with_state(mut self, mut state: BrowserState) -> Self {
        let before = state.active_columns.len();
        state.active_columns.retain(|id| self.registry.contains(id));
        if state.active_columns.len() != before {
            debug!(target: "browsecol::session", "dropped {} unknown active columns", before - state.active_columns.len());
        }
        if state.sort_column.as_deref().is_some_and(|id| !self.registry.contains(id)) {
            state.sort_column = None;
        }
        self.state = state;
        self
    }

    pub fn collection(&self) -> &Collection { self.collection }
    pub fn config(&self) -> &EffectiveConfig { &self.config }
    pub fn registry(&self) -> &ColumnRegistry { &self.registry }
    pub fn state(&self) -> &BrowserState { &self.state }

    /// Every column the session offers, by label.
    pub fn columns(&self) -> Vec<&ColumnDescriptor> { self.registry.sorted() }

    pub fn set_active_columns<S: AsRef<str>>(&mut self, ids: &[S]) {
        self.state.active_columns = ids
            .iter()
            .map(|s| s.as_ref().to_string())
            .filter(|id| self.registry.contains(id))
            .collect();
    }

    pub fn set_sort(&mut self, column_id: Option<&str>, direction: SortDirection) {
        self.state.sort_column = column_id.map(str::to_string);
        self.state.sort_direction = direction;
    }

    pub fn cell_text(&self, card_id: i64, column_id: &str) -> CellText {
        resolve_row(self.collection, &self.registry, card_id, &[column_id]).remove(0)
    }

    /// Cells of the active columns for one card.
    pub fn row(&self, card_id: i64) -> Vec<CellText> {
        resolve_row(self.collection, &self.registry, card_id, &self.state.active_columns)
    }

    pub fn plan_sort(&self, column_id: &str) -> SortPlan { sort::plan_sort(&self.registry, column_id) }

    /// Card ids matching `scope`, in the session's sort order. A sort that fails
    /// is logged and replaced by card order.
    pub fn search(&self, scope: &SearchScope) -> AppResult<Vec<i64>> {
        let sort = self.state.sort_column.as_deref().map(|id| (id, self.state.sort_direction));
        match sort::search(self.collection, &self.registry, scope, sort) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!(target: "browsecol::session", "sort by {:?} failed, using card order: {}", self.state.sort_column, e);
                sort::default_order(self.collection, scope, self.state.sort_direction)
            }
        }
    }

    pub fn set_value(&self, column_id: &str, card_id: i64, text: &str, confirm: &dyn Confirm) -> AppResult<WriteOutcome> {
        mutate::set_value(self.collection, &self.registry, &self.config, column_id, card_id, text, confirm)
    }

    pub fn menu(&self) -> Vec<MenuNode> { menu::project(&self.registry) }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
