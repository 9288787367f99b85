// One column per distinct note field name, id `_field_<name>`.
//
// Every field column shares a single resolver and writer: the field name is
// recovered from the column id, and its position per note type comes from a
// map built once at load.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::collection::now_secs;
use crate::error::{AppError, AppResult};
use crate::format::html_to_text_line;
use crate::mutate::WriteContext;
use crate::registry::{ColumnDescriptor, SortSpec};
use crate::resolve::RowContext;

use super::{ColumnContributor, LoadContext};

pub const GROUP: &str = " - Fields -";
pub const ID_PREFIX: &str = "_field_";

/// field name -> note type id -> field ordinal
type FieldMap = HashMap<String, HashMap<i64, usize>>;

pub fn field_column_id(name: &str) -> String {
    format!("{}{}", ID_PREFIX, name)
}

fn field_ord(map: &FieldMap, column_id: &str, mid: i64) -> Option<usize> {
    let name = column_id.strip_prefix(ID_PREFIX)?;
    map.get(name)?.get(&mid).copied()
}

/// `CASE` over every note type that has the field, comparing the text the cell
/// shows (markup stripped). Notes of other types sort as NULL.
pub fn field_sort_expr(owners: &[(i64, usize)]) -> String {
    if owners.is_empty() {
        return "NULL".to_string();
    }
    let whens: Vec<String> = owners
        .iter()
        .map(|(mid, ord)| format!("WHEN n.mid = {} THEN field_text_at_index(n.flds, {})", mid, ord))
        .collect();
    format!("(CASE {} ELSE NULL END)", whens.join(" "))
}

fn resolve_field(map: &FieldMap, row: &RowContext<'_>) -> AppResult<Option<String>> {
    let Some(ord) = field_ord(map, row.column_id, row.note.mid) else {
        return Ok(None);
    };
    let raw = row.note.fields.get(ord).ok_or_else(|| {
        AppError::exec("field_count", format!("note {} has {} fields, expected at least {}", row.note.id, row.note.fields.len(), ord + 1))
    })?;
    Ok(Some(html_to_text_line(raw)))
}

fn write_field(map: &FieldMap, w: &WriteContext<'_>, text: &str) -> AppResult<()> {
    let mut note = w.note()?;
    let name = w.column_id.strip_prefix(ID_PREFIX).unwrap_or(w.column_id);
    let Some(ord) = field_ord(map, w.column_id, note.mid) else {
        let nt = w.collection.notetype(note.mid)?;
        return Err(AppError::user(
            "field_missing",
            format!("The field \"{}\" does not belong to the note type \"{}\".", name, nt.name),
        ));
    };
    let slot = note
        .fields
        .get_mut(ord)
        .ok_or_else(|| AppError::exec("field_count", format!("note {} is missing field {}", note.id, ord)))?;
    *slot = text.nfc().collect();
    note.mtime = now_secs();
    w.collection.update_note(&note)
}

pub struct NoteFieldColumns;

impl ColumnContributor for NoteFieldColumns {
    fn name(&self) -> &str { "note_fields" }

    fn contribute(&self, ctx: &mut LoadContext<'_>) -> AppResult<()> {
        let notetypes = ctx.collection.notetypes()?;

        // notetypes() is ordered by id, so each CASE lists its owners in a stable order.
        let mut owners: BTreeMap<String, Vec<(i64, usize)>> = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut map: FieldMap = HashMap::new();
        for nt in &notetypes {
            for (ord, name) in nt.fields.iter().enumerate() {
                owners.entry(name.clone()).or_default().push((nt.id, ord));
                groups.entry(name.clone()).or_default().push(nt.name.clone());
                map.entry(name.clone()).or_default().insert(nt.id, ord);
            }
        }
        let map = Arc::new(map);

        for (name, owned_by) in &owners {
            let resolve_map = Arc::clone(&map);
            let write_map = Arc::clone(&map);
            let mut d = ColumnDescriptor::new(field_column_id(name), name.as_str())
                .resolver(move |row| resolve_field(&resolve_map, row))
                .sort(SortSpec::inline(field_sort_expr(owned_by)))
                .writer(move |w, text| write_field(&write_map, w, text));
            if ctx.config.single_field_list {
                d = d.in_group(&[GROUP]);
            } else if let Some(types) = groups.get(name) {
                for nt_name in types {
                    d = d.in_group(&[GROUP, nt_name.as_str()]);
                }
            }
            ctx.register(d);
        }
        debug!(target: "browsecol::session", "registered {} field columns", owners.len());
        Ok(())
    }
}
