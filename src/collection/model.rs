//! Row types for the collection tables. Kept free of SQL so resolvers and writers
//! can be unit tested against plain values.

use serde::{Deserialize, Serialize};

pub const FIELD_SEPARATOR: char = '\u{1f}';

pub const CARD_TYPE_NEW: i64 = 0;
pub const CARD_TYPE_LRN: i64 = 1;
pub const CARD_TYPE_REV: i64 = 2;
pub const CARD_TYPE_RELEARNING: i64 = 3;

pub const QUEUE_TYPE_MANUALLY_BURIED: i64 = -3;
pub const QUEUE_TYPE_SIBLING_BURIED: i64 = -2;
pub const QUEUE_TYPE_SUSPENDED: i64 = -1;
pub const QUEUE_TYPE_NEW: i64 = 0;
pub const QUEUE_TYPE_LRN: i64 = 1;
pub const QUEUE_TYPE_REV: i64 = 2;
pub const QUEUE_TYPE_DAY_LEARN_RELEARN: i64 = 3;
pub const QUEUE_TYPE_PREVIEW: i64 = 4;

pub const NOTETYPE_KIND_STANDARD: i64 = 0;
pub const NOTETYPE_KIND_CLOZE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub nid: i64,
    pub did: i64,
    pub ord: i64,
    pub mtime: i64,
    pub usn: i64,
    pub ctype: i64,
    pub queue: i64,
    pub due: i64,
    pub ivl: i64,
    pub factor: i64,
    pub reps: i64,
    pub lapses: i64,
    pub left: i64,
    pub odue: i64,
    pub odid: i64,
    pub flags: i64,
    pub data: String,
}

impl Card {
    /// A freshly added card: new, due at its position, not in a filtered deck.
    pub fn new(id: i64, nid: i64, did: i64, ord: i64) -> Self {
        Self {
            id, nid, did, ord,
            mtime: 0, usn: -1,
            ctype: CARD_TYPE_NEW, queue: QUEUE_TYPE_NEW,
            due: id, ivl: 0, factor: 0, reps: 0, lapses: 0, left: 0,
            odue: 0, odid: 0, flags: 0,
            data: String::new(),
        }
    }

    pub fn in_filtered_deck(&self) -> bool { self.odid != 0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub guid: String,
    pub mid: i64,
    pub mtime: i64,
    pub usn: i64,
    pub tags: Vec<String>,
    pub fields: Vec<String>,
    pub flags: i64,
    pub data: String,
}

impl Note {
    pub fn joined_fields(&self) -> String {
        self.fields.join(&FIELD_SEPARATOR.to_string())
    }

    pub fn split_fields(flds: &str) -> Vec<String> {
        flds.split(FIELD_SEPARATOR).map(str::to_string).collect()
    }

    /// Tags are stored space-delimited with a leading and trailing space so
    /// `like '% tag %'` matches whole tags.
    pub fn joined_tags(&self) -> String {
        if self.tags.is_empty() { String::new() } else { format!(" {} ", self.tags.join(" ")) }
    }

    pub fn split_tags(tags: &str) -> Vec<String> {
        tags.split_whitespace().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    /// Filtered ("dynamic") deck.
    pub dynamic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteTypeKind {
    Standard,
    Cloze,
}

impl NoteTypeKind {
    pub fn from_i64(v: i64) -> Self { if v == NOTETYPE_KIND_CLOZE { NoteTypeKind::Cloze } else { NoteTypeKind::Standard } }
    pub fn as_i64(self) -> i64 {
        match self {
            NoteTypeKind::Standard => NOTETYPE_KIND_STANDARD,
            NoteTypeKind::Cloze => NOTETYPE_KIND_CLOZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteType {
    pub id: i64,
    pub name: String,
    pub kind: NoteTypeKind,
    /// Field names by ordinal.
    pub fields: Vec<String>,
    /// Template names by ordinal.
    pub templates: Vec<String>,
}

impl NoteType {
    pub fn field_ord(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Display name of the template a card with ordinal `ord` uses. Cloze types
    /// have one template shared by every cloze number.
    pub fn template_name(&self, ord: i64) -> Option<String> {
        match self.kind {
            NoteTypeKind::Cloze => self.templates.first().map(|t| format!("{} {}", t, ord + 1)),
            NoteTypeKind::Standard => usize::try_from(ord).ok().and_then(|o| self.templates.get(o)).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevlogEntry {
    /// Review timestamp, epoch milliseconds.
    pub id: i64,
    pub cid: i64,
    pub usn: i64,
    pub ease: i64,
    pub ivl: i64,
    pub last_ivl: i64,
    pub factor: i64,
    /// Answer duration in milliseconds.
    pub time: i64,
    pub rtype: i64,
}

impl RevlogEntry {
    pub fn new(id: i64, cid: i64, ease: i64, ivl: i64, time: i64) -> Self {
        Self { id, cid, usn: -1, ease, ivl, last_ivl: 0, factor: 2500, time, rtype: 1 }
    }
}
