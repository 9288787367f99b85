use super::*;
use crate::collection::{NoteTypeKind, CARD_TYPE_REV, QUEUE_TYPE_LRN, QUEUE_TYPE_REV};
use crate::config::InteractionMode;
use crate::registry::ColumnDescriptor;
use std::cell::Cell;

fn editable() -> EffectiveConfig {
    EffectiveConfig { interaction: InteractionMode::Editable, ..EffectiveConfig::default() }
}

fn fixture() -> (Collection, i64) {
    let col = Collection::open_in_memory().unwrap();
    let did = col.add_deck("Default", false).unwrap();
    let mid = col.add_notetype("Basic", NoteTypeKind::Standard, &["Front", "Back"], &["Card 1"]).unwrap();
    let nid = col.add_note(mid, &["q", "a"], &[]).unwrap();
    let cid = col.add_card(nid, did, 0).unwrap();
    (col, cid)
}

fn registry() -> ColumnRegistry {
    let mut reg = ColumnRegistry::new();
    reg.register(
        ColumnDescriptor::new("level", "Level")
            .resolver(|ctx| Ok(Some(ctx.card.flags.to_string())))
            .writer(|ctx, text| {
                let v = parse_ranged(text, 0..=7, &[("red", 1), ("blue", 4)])?;
                let mut card = ctx.card()?;
                card.flags = v;
                ctx.collection.update_card(&card)
            }),
    );
    // Writes first, then rejects: the transaction must undo the first write.
    reg.register(ColumnDescriptor::new("half", "Half").writer(|ctx, text| {
        let mut card = ctx.card()?;
        card.left = 99;
        ctx.collection.update_card(&card)?;
        parse_int(text).map(|_| ())
    }));
    reg.register(ColumnDescriptor::new("guarded", "Guarded").writer(|ctx, _| {
        ctx.confirm("really?")?;
        let mut card = ctx.card()?;
        card.reps += 1;
        ctx.collection.update_card(&card)
    }));
    reg.register(ColumnDescriptor::new("readonly", "Read Only").resolver(|_| Ok(None)));
    reg
}

fn raw_row(col: &Collection, cid: i64) -> Vec<rusqlite::types::Value> {
    col.conn()
        .query_row("SELECT * FROM cards WHERE id = ?1", [cid], |r| (0..18usize).map(|i| r.get(i)).collect())
        .unwrap()
}

#[test]
fn invalid_values_leave_row_untouched() {
    let (col, cid) = fixture();
    let reg = registry();
    let before = raw_row(&col, cid);
    for bad in ["8", "-1", "magenta", "", "3.5"] {
        let err = set_value(&col, &reg, &editable(), "level", cid, bad, &AlwaysConfirm).unwrap_err();
        assert!(err.is_rejection(), "{:?}", err);
        assert_eq!(raw_row(&col, cid), before, "after '{}'", bad);
    }
    let err = set_value(&col, &reg, &editable(), "half", cid, "nope", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "not_a_number");
    assert_eq!(raw_row(&col, cid), before);
}

#[test]
fn valid_value_applies_and_names_are_accepted() {
    let (col, cid) = fixture();
    let reg = registry();
    assert_eq!(set_value(&col, &reg, &editable(), "level", cid, "Blue", &AlwaysConfirm).unwrap(), WriteOutcome::Applied);
    assert_eq!(col.card(cid).unwrap().flags, 4);
    assert_eq!(set_value(&col, &reg, &editable(), "level", cid, "4", &AlwaysConfirm).unwrap(), WriteOutcome::Unchanged);
}

#[test]
fn declined_confirmation_is_a_rejection() {
    let (col, cid) = fixture();
    let reg = registry();
    let asked = Cell::new(0);
    let no = |_: &str| {
        asked.set(asked.get() + 1);
        false
    };
    let err = set_value(&col, &reg, &editable(), "guarded", cid, "x", &no).unwrap_err();
    assert!(matches!(err, AppError::Declined { .. }));
    assert_eq!(asked.get(), 1);
    assert_eq!(col.card(cid).unwrap().reps, 0);

    set_value(&col, &reg, &editable(), "guarded", cid, "x", &AlwaysConfirm).unwrap();
    assert_eq!(col.card(cid).unwrap().reps, 1);
}

#[test]
fn gateway_requires_editable_mode_and_a_writer() {
    let (col, cid) = fixture();
    let reg = registry();
    let err = set_value(&col, &reg, &EffectiveConfig::default(), "level", cid, "1", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "not_editable");
    let err = set_value(&col, &reg, &editable(), "readonly", cid, "1", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "read_only");
    let err = set_value(&col, &reg, &editable(), "missing", cid, "1", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "no_column");
    let err = set_value(&col, &reg, &editable(), "level", 777, "1", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "no_card");
}

#[test]
fn moving_into_and_out_of_filtered_decks() {
    let (col, cid) = fixture();
    let home = col.deck_by_name("default").unwrap().unwrap();
    let filtered_id = col.add_deck("Cram", true).unwrap();
    let filtered = col.deck(filtered_id).unwrap().unwrap();

    let mut card = col.card(cid).unwrap();
    card.ctype = CARD_TYPE_REV;
    card.queue = QUEUE_TYPE_REV;
    card.due = 40;
    col.update_card(&card).unwrap();

    move_card_to_deck(&col, &mut card, &filtered).unwrap();
    let stored = col.card(cid).unwrap();
    assert_eq!((stored.did, stored.odid, stored.odue), (filtered.id, home.id, 40));

    let mut card = stored;
    card.due = -5;
    move_card_to_deck(&col, &mut card, &home).unwrap();
    let stored = col.card(cid).unwrap();
    assert_eq!((stored.did, stored.odid, stored.odue, stored.due), (home.id, 0, 0, 40));
    assert_eq!(stored.queue, QUEUE_TYPE_REV);
}

#[test]
fn learning_cards_leaving_filtered_decks_become_new() {
    let (col, cid) = fixture();
    let home = col.deck_by_name("Default").unwrap().unwrap();
    let filtered = col.deck(col.add_deck("Cram", true).unwrap()).unwrap().unwrap();
    let mut card = col.card(cid).unwrap();
    card.ctype = CARD_TYPE_LRN;
    card.queue = QUEUE_TYPE_LRN;
    move_card_to_deck(&col, &mut card, &filtered).unwrap();
    move_card_to_deck(&col, &mut card, &home).unwrap();
    let stored = col.card(cid).unwrap();
    assert_eq!((stored.ctype, stored.queue), (CARD_TYPE_NEW, QUEUE_TYPE_NEW));
}

#[test]
fn decks_are_found_by_id_or_name() {
    let (col, _) = fixture();
    let id = col.add_deck("Spanish::Verbs", false).unwrap();
    assert_eq!(find_deck(&col, &id.to_string()).unwrap().map(|d| d.id), Some(id));
    assert_eq!(find_deck(&col, " spanish::verbs ").unwrap().map(|d| d.id), Some(id));
    assert!(find_deck(&col, "French").unwrap().is_none());
}
