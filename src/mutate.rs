//! Mutation gateway: applies an edited cell value through the column's writer.
//!
//! Writers validate before touching anything and run inside a single collection
//! transaction, so a rejected or failed edit leaves every row as it was. Writers
//! must not open transactions of their own.

use tracing::{debug, info};

use crate::collection::{Card, Collection, Deck, Note, CARD_TYPE_LRN, CARD_TYPE_NEW, QUEUE_TYPE_NEW};
use crate::config::EffectiveConfig;
use crate::error::{AppError, AppResult};
use crate::registry::ColumnRegistry;
use crate::resolve::{resolve, CellText, RowContext};

/// Host-supplied yes/no prompt.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool { self(prompt) }
}

pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool { true }
}

pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool { false }
}

pub struct WriteContext<'a> {
    pub collection: &'a Collection,
    pub card_id: i64,
    pub column_id: &'a str,
    confirm: &'a dyn Confirm,
}

impl<'a> WriteContext<'a> {
    pub fn new(collection: &'a Collection, card_id: i64, column_id: &'a str, confirm: &'a dyn Confirm) -> Self {
        Self { collection, card_id, column_id, confirm }
    }

    pub fn card(&self) -> AppResult<Card> { self.collection.card(self.card_id) }

    pub fn note(&self) -> AppResult<Note> {
        let card = self.card()?;
        self.collection.note(card.nid)
    }

    /// Ask the host; a "no" becomes a `Declined` error so the writer can `?` it.
    pub fn confirm(&self, prompt: &str) -> AppResult<()> {
        if self.confirm.confirm(prompt) {
            Ok(())
        } else {
            debug!(target: "browsecol::mutate", "'{}' on card {} declined", self.column_id, self.card_id);
            Err(AppError::declined("declined", "change declined"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The edit matched the displayed value; nothing was written.
    Unchanged,
}

/// Apply `new_text` to `column_id` for one card.
pub fn set_value(
    collection: &Collection,
    registry: &ColumnRegistry,
    config: &EffectiveConfig,
    column_id: &str,
    card_id: i64,
    new_text: &str,
    confirm: &dyn Confirm,
) -> AppResult<WriteOutcome> {
    if !config.editable() {
        return Err(AppError::not_editable("not_editable", "browser is not in editable mode"));
    }
    let descriptor = registry
        .get(column_id)
        .ok_or_else(|| AppError::not_found("no_column", format!("unknown column '{}'", column_id)))?;
    let writer = descriptor
        .write_fn()
        .ok_or_else(|| AppError::not_editable("read_only", format!("column '{}' is read-only", descriptor.label())))?;

    let card = collection.card(card_id)?;
    if descriptor.has_resolver() {
        let note = collection.note(card.nid)?;
        let ctx = RowContext { collection, card: &card, note: &note, column_id };
        let unchanged = match resolve(registry, &ctx) {
            CellText::Empty => new_text.is_empty(),
            CellText::Text(s) => s == new_text,
            CellText::Fault(_) => false,
        };
        if unchanged {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    let ctx = WriteContext::new(collection, card_id, column_id, confirm);
    collection.transact(|_| writer(&ctx, new_text))?;
    info!(target: "browsecol::mutate", "column '{}' updated on card {}", column_id, card_id);
    Ok(WriteOutcome::Applied)
}

// --- validation helpers shared by writers ---

pub fn parse_int(text: &str) -> AppResult<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| AppError::user("not_a_number", format!("'{}' is not a whole number", text.trim())))
}

/// Accept either a number in `range` or one of `names` (case-insensitive).
pub fn parse_ranged(text: &str, range: std::ops::RangeInclusive<i64>, names: &[(&str, i64)]) -> AppResult<i64> {
    let t = text.trim();
    let value = match t.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let lower = t.to_lowercase();
            names
                .iter()
                .find(|(n, _)| *n == lower)
                .map(|(_, v)| *v)
                .ok_or_else(|| AppError::user("unknown_value", format!("'{}' is not an accepted value", t)))?
        }
    };
    if !range.contains(&value) {
        return Err(AppError::user(
            "out_of_range",
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ));
    }
    Ok(value)
}

/// A deck given either by id or by (case-insensitive) name.
pub fn find_deck(collection: &Collection, text: &str) -> AppResult<Option<Deck>> {
    let t = text.trim();
    if let Ok(id) = t.parse::<i64>() {
        if let Some(d) = collection.deck(id)? {
            return Ok(Some(d));
        }
    }
    collection.deck_by_name(t)
}

/// Move `card` into `target`, keeping the filtered-deck bookkeeping consistent,
/// and write it back.
pub fn move_card_to_deck(collection: &Collection, card: &mut Card, target: &Deck) -> AppResult<()> {
    let from_filtered = collection.deck(card.did)?.map(|d| d.dynamic).unwrap_or(false);
    if target.dynamic && !from_filtered {
        card.odid = card.did;
        card.odue = card.due;
        card.did = target.id;
    } else {
        card.did = target.id;
        if !target.dynamic && from_filtered {
            if card.ctype == CARD_TYPE_LRN {
                card.queue = QUEUE_TYPE_NEW;
                card.ctype = CARD_TYPE_NEW;
            } else {
                card.queue = card.ctype;
            }
            card.due = card.odue;
            card.odue = 0;
            card.odid = 0;
        }
    }
    collection.update_card(card)?;
    debug!(target: "browsecol::mutate", "card {} moved to deck {}", card.id, target.id);
    Ok(())
}

#[cfg(test)]
#[path = "mutate_tests.rs"]
mod mutate_tests;
