// Raw note and card columns. Only registered when internal fields are enabled.

use unicode_normalization::UnicodeNormalization;

use crate::collection::{now_secs, Card, NoteTypeKind, FIELD_SEPARATOR};
use crate::error::{AppError, AppResult};
use crate::mutate::{find_deck, move_card_to_deck, parse_int, parse_ranged, WriteContext};
use crate::registry::{ColumnDescriptor, SortSpec};

use super::{ColumnContributor, LoadContext};

pub const NOTE_GROUP: &str = "- Note (internal) -";
pub const CARD_GROUP: &str = "- Card (internal) -";

/// Separator shown between fields in the "Note Fields" column.
pub const FIELDS_DISPLAY_SEPARATOR: char = '\u{25A0}';

pub const CARD_TYPE_NAMES: [(&str, i64); 4] = [("new", 0), ("lrn", 1), ("rev", 2), ("relearning", 3)];

pub const QUEUE_NAMES: [(&str, i64); 8] = [
    ("manually buried", -3),
    ("sibling buried", -2),
    ("suspended", -1),
    ("new", 0),
    ("lrn", 1),
    ("rev", 2),
    ("day learn relearn", 3),
    ("preview", 4),
];

pub fn card_type_label(ctype: i64) -> String {
    match ctype {
        0 => "New".to_string(),
        1 => "Lrn".to_string(),
        2 => "Rev".to_string(),
        3 => "Relearning".to_string(),
        other => other.to_string(),
    }
}

pub fn queue_label(queue: i64) -> String {
    match queue {
        -3 => "Manually Buried".to_string(),
        -2 => "Buried Siblings".to_string(),
        -1 => "Suspended".to_string(),
        0 => "New".to_string(),
        1 => "Lrn".to_string(),
        2 => "Rev".to_string(),
        3 => "Day learn relearn".to_string(),
        4 => "Preview".to_string(),
        other => other.to_string(),
    }
}

fn update_card_with(w: &WriteContext<'_>, f: impl FnOnce(&mut Card)) -> AppResult<()> {
    let mut card = w.card()?;
    f(&mut card);
    w.collection.update_card(&card)
}

fn write_note_id(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let new_id = parse_int(text)?;
    let card = w.card()?;
    w.confirm(
        "Do you really want to change the id of the note? This may create problems during \
         synchronisation if the note has been modified on another computer.",
    )?;
    w.collection.change_note_id(card.nid, new_id)
}

fn write_guid(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let guid = text.trim();
    if guid.is_empty() {
        return Err(AppError::user("empty_guid", "guid cannot be empty"));
    }
    w.confirm(
        "Do you really want to change the globally unique id of the note? This may create problems \
         during synchronisation if the note has been modified on another computer.",
    )?;
    let mut note = w.note()?;
    note.guid = guid.to_string();
    note.mtime = now_secs();
    w.collection.update_note(&note)
}

fn write_note_usn(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let usn = parse_int(text)?;
    let mut note = w.note()?;
    note.usn = usn;
    w.collection.update_note(&note)
}

fn write_note_fields(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let mut note = w.note()?;
    // A stored field holding the separator cannot round-trip through the combined cell.
    if let Some(i) = note.fields.iter().position(|f| f.contains(FIELDS_DISPLAY_SEPARATOR)) {
        return Err(AppError::user(
            "separator_in_field",
            format!("field {} contains '{}'; edit it through its own field column", i + 1, FIELDS_DISPLAY_SEPARATOR),
        ));
    }
    let fields: Vec<String> = text.split(FIELDS_DISPLAY_SEPARATOR).map(|f| f.nfc().collect()).collect();
    if fields.len() != note.fields.len() {
        return Err(AppError::user(
            "field_count",
            format!("expected {} fields, got {}", note.fields.len(), fields.len()),
        ));
    }
    if fields.iter().any(|f| f.contains(FIELD_SEPARATOR)) {
        return Err(AppError::user("bad_field", "field text contains a reserved separator"));
    }
    note.fields = fields;
    note.mtime = now_secs();
    w.collection.update_note(&note)
}

fn write_card_id(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let new_id = parse_int(text)?;
    w.confirm(
        "Do you really want to change the id of the card? This may create problems during \
         synchronisation if the note has been modified on another computer.",
    )?;
    w.collection.change_card_id(w.card_id, new_id)
}

fn write_deck_id(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let target = find_deck(w.collection, text)?
        .ok_or_else(|| AppError::not_found("no_deck", format!("no deck '{}'", text.trim())))?;
    let mut card = w.card()?;
    move_card_to_deck(w.collection, &mut card, &target)
}

fn write_original_deck_id(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let card = w.card()?;
    if !card.in_filtered_deck() {
        return Err(AppError::user("not_filtered", "only cards in a filtered deck have an original deck"));
    }
    let deck = find_deck(w.collection, text)?
        .ok_or_else(|| AppError::not_found("no_deck", format!("no deck '{}'", text.trim())))?;
    if deck.dynamic {
        return Err(AppError::user("filtered_original", "the original deck cannot be a filtered deck"));
    }
    update_card_with(w, |c| c.odid = deck.id)
}

fn write_ord(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let ord = parse_int(text)?;
    if ord < 0 {
        return Err(AppError::user("out_of_range", "ordinal cannot be negative"));
    }
    let note = w.note()?;
    let nt = w.collection.notetype(note.mid)?;
    if nt.kind == NoteTypeKind::Standard && ord as usize >= nt.templates.len() {
        return Err(AppError::user(
            "no_template",
            format!("note type '{}' has {} templates", nt.name, nt.templates.len()),
        ));
    }
    w.confirm(
        "Do you really want to change the ord of the card? The card may be empty, or duplicate, \
         unless you know exactly what you do.",
    )?;
    update_card_with(w, |c| c.ord = ord)
}

fn write_card_type(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let ctype = parse_ranged(text, 0..=3, &CARD_TYPE_NAMES)?;
    w.confirm(
        "Do you really want to change the card type of the card? Values may be inconsistent if you \
         don't change the queue type, due value, etc.",
    )?;
    update_card_with(w, |c| c.ctype = ctype)
}

fn write_queue(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let queue = parse_ranged(text, -3..=4, &QUEUE_NAMES)?;
    w.confirm(
        "Do you really want to change the queue type of the card? Values may be inconsistent if you \
         don't change the card type, due value, etc.",
    )?;
    update_card_with(w, |c| c.queue = queue)
}

fn write_original_due(w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let odue = parse_int(text)?;
    w.confirm(
        "Do you really want to change the original due? If the card is not already in a filtered \
         deck, or moved to one, it may have unexpected effects.",
    )?;
    update_card_with(w, |c| c.odue = odue)
}

pub struct InternalColumns;

impl ColumnContributor for InternalColumns {
    fn name(&self) -> &str { "internal" }

    fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()> {
        if !ctx.config.show_internal_fields {
            return Ok(());
        }
        let note = [NOTE_GROUP];
        let card = [CARD_GROUP];

        ctx.register(
            ColumnDescriptor::new("nid", "Note ID")
                .resolver(|r| Ok(Some(r.note.id.to_string())))
                .sort(SortSpec::inline("n.id"))
                .writer(write_note_id)
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("nguid", "Note Guid")
                .resolver(|r| Ok(Some(r.note.guid.clone())))
                .sort(SortSpec::inline("n.guid").binary().lexical())
                .writer(write_guid)
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("nmid", "Model ID")
                .resolver(|r| Ok(Some(r.note.mid.to_string())))
                .sort(SortSpec::inline("n.mid"))
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("nusn", "Note USN")
                .resolver(|r| Ok(Some(r.note.usn.to_string())))
                .sort(SortSpec::inline("n.usn"))
                .writer(write_note_usn)
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("nfields", "Note Fields")
                .resolver(|r| Ok(Some(r.note.fields.join(&FIELDS_DISPLAY_SEPARATOR.to_string()))))
                .sort(SortSpec::inline("n.flds").lexical())
                .writer(write_note_fields)
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("nflags", "Note Flags")
                .resolver(|r| Ok(Some(r.note.flags.to_string())))
                .sort(SortSpec::inline("n.flags"))
                .in_group(&note),
        );
        ctx.register(
            ColumnDescriptor::new("ndata", "Note Data")
                .resolver(|r| Ok(Some(r.note.data.clone())))
                .sort(SortSpec::inline("n.data").lexical())
                .in_group(&note),
        );

        ctx.register(
            ColumnDescriptor::new("cid", "Card ID")
                .resolver(|r| Ok(Some(r.card.id.to_string())))
                .sort(SortSpec::inline("c.id"))
                .writer(write_card_id)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("cdid", "Deck ID")
                .resolver(|r| Ok(Some(r.card.did.to_string())))
                .sort(SortSpec::inline("c.did"))
                .writer(write_deck_id)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("codid", "Original Deck ID")
                .resolver(|r| Ok(Some(r.card.odid.to_string())))
                .sort(SortSpec::inline("c.odid"))
                .writer(write_original_deck_id)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("cord", "Card Ordinal")
                .resolver(|r| Ok(Some(r.card.ord.to_string())))
                .sort(SortSpec::inline("c.ord"))
                .writer(write_ord)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("cusn", "Card USN")
                .resolver(|r| Ok(Some(r.card.usn.to_string())))
                .sort(SortSpec::inline("c.usn"))
                .writer(|w, text| {
                    let usn = parse_int(text)?;
                    update_card_with(w, |c| c.usn = usn)
                })
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("ctype", "Card Type")
                .resolver(|r| Ok(Some(card_type_label(r.card.ctype))))
                .sort(SortSpec::inline("c.type"))
                .writer(write_card_type)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("cqueue", "Card Queue")
                .resolver(|r| Ok(Some(queue_label(r.card.queue))))
                .sort(SortSpec::inline("c.queue"))
                .writer(write_queue)
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("cleft", "Card Left")
                .resolver(|r| Ok(Some(r.card.left.to_string())))
                .sort(SortSpec::inline(r#"c."left""#))
                .writer(|w, text| {
                    let left = parse_int(text)?;
                    update_card_with(w, |c| c.left = left)
                })
                .in_group(&card),
        );
        ctx.register(
            ColumnDescriptor::new("codue", "Card Original Due")
                .resolver(|r| Ok(Some(r.card.odue.to_string())))
                .sort(SortSpec::inline("c.odue"))
                .writer(write_original_due)
                .in_group(&card),
        );
        Ok(())
    }
}
