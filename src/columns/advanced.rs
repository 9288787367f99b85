// Review statistics and scheduling columns, listed under "- Advanced -".

use crate::collection::{
    Card, CARD_TYPE_NEW, CARD_TYPE_REV, QUEUE_TYPE_DAY_LEARN_RELEARN, QUEUE_TYPE_LRN,
    QUEUE_TYPE_NEW, QUEUE_TYPE_REV,
};
use crate::error::{AppError, AppResult};
use crate::format;
use crate::mutate::{find_deck, move_card_to_deck, parse_ranged};
use crate::registry::{ColumnDescriptor, SortSpec};

use super::{scalar_f64, scalar_i64, ColumnContributor, LoadContext};

pub const GROUP: &str = "- Advanced -";

/// Flag numbers and their names; the low three bits of `cards.flags`.
pub const FLAG_NAMES: [(&str, i64); 9] = [
    ("", 0),
    ("no", 0),
    ("red", 1),
    ("orange", 2),
    ("green", 3),
    ("blue", 4),
    ("pink", 5),
    ("turquoise", 6),
    ("purple", 7),
];

const FLAG_MASK: i64 = 0b111;
const TODAY: &str = "(SELECT today FROM col WHERE id = 1)";

pub fn flag_label(flags: i64) -> Option<&'static str> {
    match flags & FLAG_MASK {
        1 => Some("Red"),
        2 => Some("Orange"),
        3 => Some("Green"),
        4 => Some("Blue"),
        5 => Some("Pink"),
        6 => Some("Turquoise"),
        7 => Some("Purple"),
        _ => None,
    }
}

fn is_review_like(card: &Card) -> bool {
    card.queue == QUEUE_TYPE_REV
        || card.queue == QUEUE_TYPE_DAY_LEARN_RELEARN
        || (card.ctype == CARD_TYPE_REV && card.queue < 0)
}

fn effective_due(card: &Card) -> i64 {
    if card.in_filtered_deck() { card.odue } else { card.due }
}

/// Days a review card is past due, if it is.
pub fn overdue_days(card: &Card, today: i64) -> Option<i64> {
    if card.queue == QUEUE_TYPE_LRN || card.queue == QUEUE_TYPE_NEW || card.ctype == CARD_TYPE_NEW {
        return None;
    }
    let diff = today - effective_due(card);
    (diff > 0 && is_review_like(card)).then_some(diff)
}

/// Elapsed share of the current interval, in percent.
pub fn percent_of_interval(card: &Card, today: i64) -> Option<f64> {
    if card.queue == QUEUE_TYPE_LRN || card.queue == QUEUE_TYPE_NEW || card.ctype == CARD_TYPE_NEW {
        return None;
    }
    if !is_review_like(card) || card.ivl == 0 {
        return None;
    }
    let last_review = effective_due(card) - card.ivl;
    Some((today - last_review) as f64 / card.ivl as f64 * 100.0)
}

fn review_like_sql() -> String {
    format!(
        "c.queue NOT IN ({lrn}, {new}) AND c.type != {tnew} \
         AND (c.queue IN ({rev}, {dlr}) OR (c.type = {trev} AND c.queue < 0))",
        lrn = QUEUE_TYPE_LRN,
        new = QUEUE_TYPE_NEW,
        tnew = CARD_TYPE_NEW,
        rev = QUEUE_TYPE_REV,
        dlr = QUEUE_TYPE_DAY_LEARN_RELEARN,
        trev = CARD_TYPE_REV,
    )
}

const EFFECTIVE_DUE_SQL: &str = "(CASE WHEN c.odid THEN c.odue ELSE c.due END)";

fn overdue_sort_expr() -> String {
    format!(
        "CASE WHEN {review} AND {today} - {due} > 0 THEN {today} - {due} END",
        review = review_like_sql(),
        today = TODAY,
        due = EFFECTIVE_DUE_SQL
    )
}

fn percent_sort_expr() -> String {
    format!(
        "CASE WHEN {review} AND c.ivl != 0 THEN (({today} - {due} + c.ivl) * 1.0) / c.ivl END",
        review = review_like_sql(),
        today = TODAY,
        due = EFFECTIVE_DUE_SQL
    )
}

pub struct AdvancedColumns;

impl ColumnContributor for AdvancedColumns {
    fn name(&self) -> &str { "advanced" }

    fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()> {
        let group = [GROUP];

        ctx.register(
            ColumnDescriptor::new("cfirst", "First Review")
                .resolver(|row| Ok(scalar_i64(row, "SELECT min(id) FROM revlog WHERE cid = ?1")?.and_then(format::date)))
                .sort(SortSpec::per_row("(SELECT min(id) FROM revlog WHERE cid = c.id)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("clast", "Last Review")
                .resolver(|row| Ok(scalar_i64(row, "SELECT max(id) FROM revlog WHERE cid = ?1")?.and_then(format::date)))
                .sort(SortSpec::per_row("(SELECT max(id) FROM revlog WHERE cid = c.id)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cavgtime", "Time (Average)")
                .resolver(|row| {
                    let v = scalar_f64(row, "SELECT avg(time) / 1000.0 FROM revlog WHERE cid = ?1")?;
                    Ok(v.filter(|s| *s != 0.0).map(format::timespan))
                })
                .sort(SortSpec::per_row("(SELECT avg(time) FROM revlog WHERE cid = c.id)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("ctottime", "Time (Total)")
                .resolver(|row| {
                    let v = scalar_f64(row, "SELECT sum(time) / 1000.0 FROM revlog WHERE cid = ?1")?;
                    Ok(v.filter(|s| *s != 0.0).map(format::timespan))
                })
                .sort(SortSpec::per_row("(SELECT sum(time) FROM revlog WHERE cid = c.id)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cfasttime", "Fastest Review")
                .resolver(|row| {
                    let v = scalar_f64(row, "SELECT time / 1000.0 FROM revlog WHERE cid = ?1 ORDER BY time ASC LIMIT 1")?;
                    Ok(v.filter(|s| *s != 0.0).map(format::timespan))
                })
                .sort(SortSpec::per_row("(SELECT time FROM revlog WHERE cid = c.id ORDER BY time ASC LIMIT 1)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cslowtime", "Slowest Review")
                .resolver(|row| {
                    let v = scalar_f64(row, "SELECT time / 1000.0 FROM revlog WHERE cid = ?1 ORDER BY time DESC LIMIT 1")?;
                    Ok(v.filter(|s| *s != 0.0).map(format::timespan))
                })
                .sort(SortSpec::per_row("(SELECT time FROM revlog WHERE cid = c.id ORDER BY time DESC LIMIT 1)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("coverdueivl", "Overdue Interval")
                .resolver(|row| Ok(overdue_days(row.card, row.collection.today()?).map(format::interval_days)))
                .sort(SortSpec::inline(overdue_sort_expr()))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cpercentageschedivl", "% of Ivl")
                .resolver(|row| {
                    let p = percent_of_interval(row.card, row.collection.today()?);
                    Ok(p.filter(|p| *p != 0.0).map(|p| format!("{:.2} %", p)))
                })
                .sort(SortSpec::inline(percent_sort_expr()))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cprevivl", "Previous Interval")
                .resolver(|row| {
                    let ivl = scalar_i64(row, "SELECT ivl FROM revlog WHERE cid = ?1 ORDER BY id DESC LIMIT 1 OFFSET 1")?;
                    // Negative intervals are learning steps in seconds.
                    Ok(ivl.map(|i| if i >= 0 { format::interval_days(i) } else { format::timespan(-i as f64) }))
                })
                .sort(SortSpec::per_row("(SELECT ivl FROM revlog WHERE cid = c.id ORDER BY id DESC LIMIT 1 OFFSET 1)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cAgainCount", "Again Count")
                .resolver(|row| {
                    let n = scalar_i64(row, "SELECT count() FROM revlog WHERE cid = ?1 AND ease = 1")?;
                    Ok(n.filter(|n| *n != 0).map(|n| n.to_string()))
                })
                .sort(SortSpec::per_row("(SELECT count() FROM revlog WHERE cid = c.id AND ease = 1)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cpct", "Percent Correct")
                .resolver(|row| {
                    let c = row.card;
                    Ok((c.reps > 0).then(|| format!("{:.0}%", 100.0 - (c.lapses as f64 / c.reps as f64) * 100.0)))
                })
                .sort(SortSpec::inline("CAST(c.lapses AS REAL) / c.reps"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cprevdur", "Previous Duration")
                .resolver(|row| {
                    let v = scalar_f64(row, "SELECT time / 1000.0 FROM revlog WHERE cid = ?1 ORDER BY id DESC LIMIT 1")?;
                    Ok(v.filter(|s| *s != 0.0).map(format::timespan))
                })
                .sort(SortSpec::per_row("(SELECT time FROM revlog WHERE cid = c.id ORDER BY id DESC LIMIT 1)"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("ctimecrtn", "Created Time (Note)")
                .resolver(|row| Ok(format::datetime(row.note.id)))
                .sort(SortSpec::inline("n.id"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cdatecrtc", "Created Date (Card)")
                .resolver(|row| Ok(format::date(row.card.id)))
                .sort(SortSpec::inline("c.id"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("ctimecrtc", "Created Time (Card)")
                .resolver(|row| Ok(format::datetime(row.card.id)))
                .sort(SortSpec::inline("c.id"))
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cdeck", "Current Deck (Filtered)")
                .resolver(|row| Ok(row.collection.deck_name(row.card.did)?))
                .sort(SortSpec::keyed("c.did", "SELECT id, name FROM decks"))
                .writer(|w, text| {
                    let name = text.trim();
                    if name.is_empty() {
                        return Err(AppError::user("empty_deck_name", "deck name is empty"));
                    }
                    let target = match find_deck(w.collection, name)? {
                        Some(d) => d,
                        None => {
                            w.confirm(&format!("{} does not exist, do you want to create this deck?", name))?;
                            let id = w.collection.add_deck(name, false)?;
                            w.collection
                                .deck(id)?
                                .ok_or_else(|| AppError::internal("deck_vanished", format!("deck {} missing after insert", id)))?
                        }
                    };
                    let mut card = w.card()?;
                    move_card_to_deck(w.collection, &mut card, &target)
                })
                .in_group(&group),
        );
        ctx.register(
            ColumnDescriptor::new("cflags", "Flag")
                .resolver(|row| Ok(flag_label(row.card.flags).map(str::to_string)))
                .sort(SortSpec::inline(format!("NULLIF(c.flags & {}, 0)", FLAG_MASK)))
                .writer(|w, text| {
                    let flag = parse_ranged(text, 0..=7, &FLAG_NAMES)?;
                    let mut card = w.card()?;
                    card.flags = (card.flags & !FLAG_MASK) | flag;
                    w.collection.update_card(&card)
                })
                .in_group(&group),
        );
        Ok(())
    }
}
