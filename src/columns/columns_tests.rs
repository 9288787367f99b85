use super::*;
use crate::collection::{NoteTypeKind, RevlogEntry, CARD_TYPE_RELEARNING, CARD_TYPE_REV, QUEUE_TYPE_REV, QUEUE_TYPE_SUSPENDED};
use crate::config::InteractionMode;
use crate::error::AppError;
use crate::mutate::{set_value, AlwaysConfirm, NeverConfirm, WriteOutcome};
use crate::resolve::{resolve_row, CellText};
use crate::sort::{plan_sort, search, SearchScope, SortDirection, SortPlan};

struct Fixture {
    col: Collection,
    deck: i64,
    basic: i64,
    cloze: i64,
}

fn fixture() -> Fixture {
    let col = Collection::open_in_memory().unwrap();
    let deck = col.add_deck("Default", false).unwrap();
    let basic = col.add_notetype("Basic", NoteTypeKind::Standard, &["Front", "Back"], &["Card 1", "Card 2"]).unwrap();
    let cloze = col.add_notetype("Cloze", NoteTypeKind::Cloze, &["Text", "Back Extra"], &["Cloze"]).unwrap();
    Fixture { col, deck, basic, cloze }
}

impl Fixture {
    fn card(&self, mid: i64, fields: &[&str], ord: i64) -> i64 {
        let nid = self.col.add_note(mid, fields, &["tag1", "tag2"]).unwrap();
        self.col.add_card(nid, self.deck, ord).unwrap()
    }
}

fn editable(internal: bool) -> EffectiveConfig {
    EffectiveConfig { interaction: InteractionMode::Editable, show_internal_fields: internal, ..EffectiveConfig::default() }
}

fn load(col: &Collection, config: &EffectiveConfig) -> ColumnRegistry {
    let mut reg = ColumnRegistry::new();
    let mut ctx = LoadContext::new(col, config, &mut reg);
    for c in builtin_contributors() {
        c.contribute(&mut ctx).unwrap();
    }
    ctx.finish();
    reg
}

fn cell(f: &Fixture, reg: &ColumnRegistry, cid: i64, column: &str) -> String {
    resolve_row(&f.col, reg, cid, &[column])[0].as_str().to_string()
}

#[test]
fn internal_columns_need_the_setting() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    assert!(reg.contains("cfirst"));
    assert!(reg.contains("_field_Front"));
    assert!(!reg.contains("nid"));
    let reg = load(&f.col, &editable(true));
    for id in ["nid", "nguid", "nmid", "nusn", "nfields", "nflags", "ndata", "cid", "cdid", "codid", "cord", "cusn", "ctype", "cqueue", "cleft", "codue"] {
        assert!(reg.contains(id), "{}", id);
    }
}

#[test]
fn removal_requests_apply_after_load() {
    struct Suppressor;
    impl ColumnContributor for Suppressor {
        fn name(&self) -> &str { "suppressor" }
        fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()> {
            ctx.request_removal("cpct");
            ctx.request_removal("not_there");
            Ok(())
        }
    }
    let f = fixture();
    let config = editable(false);
    let mut reg = ColumnRegistry::new();
    let mut ctx = LoadContext::new(&f.col, &config, &mut reg);
    // Runs first, yet still removes a column registered later.
    Suppressor.contribute(&mut ctx).unwrap();
    for c in builtin_contributors() {
        c.contribute(&mut ctx).unwrap();
    }
    assert_eq!(ctx.finish(), 1);
    assert!(!reg.contains("cpct"));
}

#[test]
fn template_names_follow_note_type_kind() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let second = f.card(f.basic, &["q", "a"], 1);
    let cloze3 = f.card(f.cloze, &["{{c3::x}}", ""], 2);
    assert_eq!(cell(&f, &reg, second, "template"), "Card 2");
    assert_eq!(cell(&f, &reg, cloze3, "template"), "Cloze 3");
    assert_eq!(cell(&f, &reg, second, "noteTags"), "tag1 tag2");
    assert_eq!(cell(&f, &reg, cloze3, "note"), "Cloze");
    let got = search(&f.col, &reg, &SearchScope::All, Some(("template", SortDirection::Ascending))).unwrap();
    assert_eq!(got, vec![second, cloze3]);
}

#[test]
fn deck_column_shows_original_deck() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let cid = f.card(f.basic, &["q", "a"], 0);
    let cram = f.col.add_deck("Cram", true).unwrap();
    let mut card = f.col.card(cid).unwrap();
    card.odid = card.did;
    card.did = cram;
    f.col.update_card(&card).unwrap();
    assert_eq!(cell(&f, &reg, cid, "deck"), "Cram (Default)");
    assert_eq!(cell(&f, &reg, cid, "cdeck"), "Cram");
}

#[test]
fn review_statistics() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let cid = f.card(f.basic, &["q", "a"], 0);
    assert_eq!(cell(&f, &reg, cid, "cfirst"), "");
    assert_eq!(cell(&f, &reg, cid, "cAgainCount"), "");
    assert_eq!(cell(&f, &reg, cid, "cpct"), "");

    let day = 86_400_000;
    f.col.add_review(&RevlogEntry::new(day, cid, 1, -600, 4000)).unwrap();
    f.col.add_review(&RevlogEntry::new(3 * day, cid, 3, 3, 2000)).unwrap();
    f.col.add_review(&RevlogEntry::new(7 * day, cid, 1, 0, 9000)).unwrap();
    assert_eq!(cell(&f, &reg, cid, "cfirst"), "1970-01-02");
    assert_eq!(cell(&f, &reg, cid, "clast"), "1970-01-08");
    assert_eq!(cell(&f, &reg, cid, "cAgainCount"), "2");
    assert_eq!(cell(&f, &reg, cid, "cavgtime"), "5 seconds");
    assert_eq!(cell(&f, &reg, cid, "ctottime"), "15 seconds");
    assert_eq!(cell(&f, &reg, cid, "cfasttime"), "2 seconds");
    assert_eq!(cell(&f, &reg, cid, "cslowtime"), "9 seconds");
    assert_eq!(cell(&f, &reg, cid, "cprevdur"), "9 seconds");
    assert_eq!(cell(&f, &reg, cid, "cprevivl"), "3 days");

    let mut card = f.col.card(cid).unwrap();
    card.reps = 4;
    card.lapses = 1;
    f.col.update_card(&card).unwrap();
    assert_eq!(cell(&f, &reg, cid, "cpct"), "75%");
    assert!(plan_sort(&reg, "cfirst").is_materialized());
    assert!(matches!(plan_sort(&reg, "cpct"), SortPlan::Inline { .. }));
}

#[test]
fn overdue_and_interval_share() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let due = f.card(f.basic, &["a", ""], 0);
    let not_due = f.card(f.basic, &["b", ""], 0);
    let suspended = f.card(f.basic, &["c", ""], 0);
    let fresh = f.card(f.basic, &["d", ""], 0);
    f.col.set_today(100).unwrap();
    for (cid, queue, card_due) in [(due, QUEUE_TYPE_REV, 90), (not_due, QUEUE_TYPE_REV, 120), (suspended, QUEUE_TYPE_SUSPENDED, 95)] {
        let mut c = f.col.card(cid).unwrap();
        c.ctype = CARD_TYPE_REV;
        c.queue = queue;
        c.due = card_due;
        c.ivl = 20;
        f.col.update_card(&c).unwrap();
    }
    assert_eq!(cell(&f, &reg, due, "coverdueivl"), "10 days");
    assert_eq!(cell(&f, &reg, not_due, "coverdueivl"), "");
    assert_eq!(cell(&f, &reg, suspended, "coverdueivl"), "5 days");
    assert_eq!(cell(&f, &reg, fresh, "coverdueivl"), "");
    assert_eq!(cell(&f, &reg, due, "cpercentageschedivl"), "150.00 %");

    let got = search(&f.col, &reg, &SearchScope::All, Some(("coverdueivl", SortDirection::Descending))).unwrap();
    assert_eq!(got, vec![due, suspended, not_due, fresh]);
}

#[test]
fn interval_share_sorts_like_its_cell() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let late = f.card(f.basic, &["a", ""], 0);
    let early = f.card(f.basic, &["b", ""], 0);
    let relearning = f.card(f.basic, &["c", ""], 0);
    let fresh = f.card(f.basic, &["d", ""], 0);
    f.col.set_today(100).unwrap();
    for (cid, ctype, queue, card_due) in [
        (late, CARD_TYPE_REV, QUEUE_TYPE_REV, 90),
        (early, CARD_TYPE_REV, QUEUE_TYPE_REV, 110),
        (relearning, CARD_TYPE_RELEARNING, QUEUE_TYPE_SUSPENDED, 95),
    ] {
        let mut c = f.col.card(cid).unwrap();
        c.ctype = ctype;
        c.queue = queue;
        c.due = card_due;
        c.ivl = 20;
        f.col.update_card(&c).unwrap();
    }
    assert_eq!(cell(&f, &reg, early, "cpercentageschedivl"), "50.00 %");
    // Suspended relearning cards show no share and sort with the blanks.
    assert_eq!(cell(&f, &reg, relearning, "cpercentageschedivl"), "");

    let got = search(&f.col, &reg, &SearchScope::All, Some(("cpercentageschedivl", SortDirection::Ascending))).unwrap();
    assert_eq!(got, vec![early, late, relearning, fresh]);
    let got = search(&f.col, &reg, &SearchScope::All, Some(("cpercentageschedivl", SortDirection::Descending))).unwrap();
    assert_eq!(got, vec![late, early, relearning, fresh]);
}

#[test]
fn flags_accept_numbers_and_colours() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let cid = f.card(f.basic, &["q", "a"], 0);
    let cfg = editable(false);
    assert_eq!(set_value(&f.col, &reg, &cfg, "cflags", cid, "Turquoise", &AlwaysConfirm).unwrap(), WriteOutcome::Applied);
    assert_eq!(cell(&f, &reg, cid, "cflags"), "Turquoise");
    set_value(&f.col, &reg, &cfg, "cflags", cid, "2", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().flags, 2);
    set_value(&f.col, &reg, &cfg, "cflags", cid, "no", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().flags, 0);
    let err = set_value(&f.col, &reg, &cfg, "cflags", cid, "9", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "out_of_range");
    let err = set_value(&f.col, &reg, &cfg, "cflags", cid, "mauve", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "unknown_value");
}

#[test]
fn current_deck_writer_creates_on_confirmation() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let cid = f.card(f.basic, &["q", "a"], 0);
    let cfg = editable(false);

    let err = set_value(&f.col, &reg, &cfg, "cdeck", cid, "Japanese", &NeverConfirm).unwrap_err();
    assert!(matches!(err, AppError::Declined { .. }));
    assert!(f.col.deck_by_name("Japanese").unwrap().is_none());
    assert_eq!(f.col.card(cid).unwrap().did, f.deck);

    set_value(&f.col, &reg, &cfg, "cdeck", cid, "Japanese", &AlwaysConfirm).unwrap();
    let jp = f.col.deck_by_name("Japanese").unwrap().unwrap();
    assert_eq!(f.col.card(cid).unwrap().did, jp.id);

    // Existing decks need no confirmation.
    set_value(&f.col, &reg, &cfg, "cdeck", cid, "default", &NeverConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().did, f.deck);
}

#[test]
fn note_field_columns() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let a = f.card(f.basic, &["<b>10</b>", "x"], 0);
    let b = f.card(f.basic, &["9", "y"], 0);
    let c = f.card(f.basic, &["100", "z"], 0);
    let d = f.card(f.basic, &["", "w"], 0);
    let cloze = f.card(f.cloze, &["text", ""], 0);

    assert_eq!(cell(&f, &reg, a, "_field_Front"), "10");
    assert_eq!(cell(&f, &reg, cloze, "_field_Front"), "");
    assert_eq!(cell(&f, &reg, cloze, "_field_Text"), "text");

    let scope = SearchScope::NoteType(f.basic);
    let got = search(&f.col, &reg, &scope, Some(("_field_Front", SortDirection::Ascending))).unwrap();
    // "<b>10</b>" sorts as the 10 it displays; blanks go last.
    assert_eq!(got, vec![b, a, c, d]);

    let got = search(&f.col, &reg, &SearchScope::All, Some(("_field_Front", SortDirection::Ascending))).unwrap();
    assert_eq!(got.last().copied(), Some(cloze));
}

#[test]
fn field_sort_matches_displayed_text() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let ten = f.card(f.basic, &["10", ""], 0);
    let nine = f.card(f.basic, &["<b>9</b>", ""], 0);
    let word = f.card(f.basic, &["<div>apple</div>", ""], 0);
    assert_eq!(cell(&f, &reg, nine, "_field_Front"), "9");
    let got = search(&f.col, &reg, &SearchScope::All, Some(("_field_Front", SortDirection::Ascending))).unwrap();
    assert_eq!(got, vec![nine, ten, word]);
}

#[test]
fn note_field_writer() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let cfg = editable(false);
    let cid = f.card(f.basic, &["old", "back"], 0);
    let cloze = f.card(f.cloze, &["text", ""], 0);

    set_value(&f.col, &reg, &cfg, "_field_Front", cid, "cafe\u{301}", &AlwaysConfirm).unwrap();
    let note = f.col.note(f.col.card(cid).unwrap().nid).unwrap();
    assert_eq!(note.fields, vec!["caf\u{e9}".to_string(), "back".to_string()]);

    let err = set_value(&f.col, &reg, &cfg, "_field_Front", cloze, "x", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "field_missing");
    assert!(err.message().contains("Cloze"));
}

#[test]
fn combined_fields_refuse_ambiguous_notes() {
    let f = fixture();
    let cfg = editable(true);
    let reg = load(&f.col, &cfg);
    let cid = f.card(f.basic, &["a\u{25A0}b", "c"], 0);
    let nid = f.col.card(cid).unwrap().nid;
    // The combined cell reads as three pieces for a two-field note.
    assert_eq!(cell(&f, &reg, cid, "nfields"), "a\u{25A0}b\u{25A0}c");
    let err = set_value(&f.col, &reg, &cfg, "nfields", cid, "a\u{25A0}b\u{25A0}c", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "separator_in_field");
    assert!(err.message().contains("field 1"));
    assert_eq!(f.col.note(nid).unwrap().fields, vec!["a\u{25A0}b".to_string(), "c".to_string()]);

    // The per-field column still edits it.
    set_value(&f.col, &reg, &cfg, "_field_Front", cid, "a", &AlwaysConfirm).unwrap();
    set_value(&f.col, &reg, &cfg, "nfields", cid, "x\u{25A0}y", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.note(nid).unwrap().fields, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn field_menu_placement_follows_config() {
    let f = fixture();
    let reg = load(&f.col, &editable(false));
    let per_type = reg.get("_field_Front").unwrap().placements().to_vec();
    assert_eq!(per_type, vec![vec![" - Fields -".to_string(), "Basic".to_string()]]);

    let single = EffectiveConfig { single_field_list: true, ..editable(false) };
    let reg = load(&f.col, &single);
    assert_eq!(reg.get("_field_Front").unwrap().placements(), &[vec![" - Fields -".to_string()]]);
}

#[test]
fn internal_writers_validate() {
    let f = fixture();
    let cfg = editable(true);
    let reg = load(&f.col, &cfg);
    let cid = f.card(f.basic, &["q", "a"], 0);
    let other = f.card(f.basic, &["q2", "a2"], 0);
    let cloze = f.card(f.cloze, &["t", ""], 0);

    assert_eq!(set_value(&f.col, &reg, &cfg, "cord", cid, "2", &AlwaysConfirm).unwrap_err().code_str(), "no_template");
    assert_eq!(set_value(&f.col, &reg, &cfg, "cord", cid, "-1", &AlwaysConfirm).unwrap_err().code_str(), "out_of_range");
    set_value(&f.col, &reg, &cfg, "cord", cid, "1", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().ord, 1);
    set_value(&f.col, &reg, &cfg, "cord", cloze, "7", &AlwaysConfirm).unwrap();

    set_value(&f.col, &reg, &cfg, "cqueue", cid, "Suspended", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().queue, QUEUE_TYPE_SUSPENDED);
    assert_eq!(cell(&f, &reg, cid, "cqueue"), "Suspended");
    set_value(&f.col, &reg, &cfg, "ctype", cid, "rev", &AlwaysConfirm).unwrap();
    assert_eq!(f.col.card(cid).unwrap().ctype, CARD_TYPE_REV);
    assert_eq!(set_value(&f.col, &reg, &cfg, "ctype", cid, "5", &AlwaysConfirm).unwrap_err().code_str(), "out_of_range");

    let before = f.col.card(cid).unwrap();
    let err = set_value(&f.col, &reg, &cfg, "cid", cid, &other.to_string(), &AlwaysConfirm).unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
    assert_eq!(f.col.card(cid).unwrap(), before);
    let err = set_value(&f.col, &reg, &cfg, "cid", cid, "5000", &NeverConfirm).unwrap_err();
    assert!(matches!(err, AppError::Declined { .. }));
    set_value(&f.col, &reg, &cfg, "cid", cid, "5000", &AlwaysConfirm).unwrap();
    assert!(f.col.card(5000).is_ok());

    let err = set_value(&f.col, &reg, &cfg, "codid", other, "Default", &AlwaysConfirm).unwrap_err();
    assert_eq!(err.code_str(), "not_filtered");
    assert_eq!(set_value(&f.col, &reg, &cfg, "nfields", other, "only one", &AlwaysConfirm).unwrap_err().code_str(), "field_count");
    set_value(&f.col, &reg, &cfg, "nfields", other, "new q\u{25A0}new a", &AlwaysConfirm).unwrap();
    assert_eq!(cell(&f, &reg, other, "_field_Back"), "new a");
    assert_eq!(cell(&f, &reg, other, "ctype"), "New");
    assert!(matches!(resolve_row(&f.col, &reg, other, &["nguid"])[0], CellText::Text(_)));
}
