// Stock browser columns made sortable: card template, tags, note type and deck.

use crate::collection::NOTETYPE_KIND_CLOZE;
use crate::error::AppResult;
use crate::registry::{ColumnDescriptor, SortSpec};

use super::{ColumnContributor, LoadContext};

pub struct BasicColumns;

fn template_sort_expr() -> String {
    format!(
        "(SELECT CASE WHEN nt.kind = {cloze} \
           THEN (SELECT t.name FROM templates t WHERE t.ntid = nt.id AND t.ord = 0) || ' ' || (c.ord + 1) \
           ELSE (SELECT t.name FROM templates t WHERE t.ntid = nt.id AND t.ord = c.ord) END \
         FROM notetypes nt WHERE nt.id = n.mid)",
        cloze = NOTETYPE_KIND_CLOZE
    )
}

impl ColumnContributor for BasicColumns {
    fn name(&self) -> &str { "basic" }

    fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()> {
        ctx.register(
            ColumnDescriptor::new("template", "Card")
                .resolver(|row| Ok(row.collection.notetype(row.note.mid)?.template_name(row.card.ord)))
                .sort(SortSpec::per_row(template_sort_expr())),
        );
        ctx.register(
            ColumnDescriptor::new("noteTags", "Tags")
                .resolver(|row| Ok(Some(row.note.tags.join(" "))))
                .sort(SortSpec::inline("n.tags").lexical()),
        );
        ctx.register(
            ColumnDescriptor::new("note", "Note")
                .resolver(|row| Ok(Some(row.collection.notetype(row.note.mid)?.name)))
                .sort(SortSpec::keyed("n.mid", "SELECT id, name FROM notetypes")),
        );
        ctx.register(
            ColumnDescriptor::new("deck", "Deck")
                .resolver(|row| {
                    let name = |id: i64| -> AppResult<String> {
                        Ok(row.collection.deck_name(id)?.unwrap_or_else(|| "[no deck]".to_string()))
                    };
                    let current = name(row.card.did)?;
                    if row.card.in_filtered_deck() {
                        Ok(Some(format!("{} ({})", current, name(row.card.odid)?)))
                    } else {
                        Ok(Some(current))
                    }
                })
                .sort(SortSpec::keyed("c.did", "SELECT id, name FROM decks")),
        );
        Ok(())
    }
}
