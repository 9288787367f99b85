//!
//! browsecol collection store
//! --------------------------
//! Typed access to a flashcard collection kept in an SQLite database: decks,
//! note types (with their fields and templates), notes, cards and the review log.
//!
//! The layout follows the host application's tables closely enough that sort
//! expressions written against `c` (cards) and `n` (notes) run unchanged. A
//! `Collection` owns its connection; every session-scoped object borrows it.
//!
//! Key responsibilities:
//! - Schema creation on open (idempotent).
//! - Registration of the SQL helper functions used by sort expressions.
//! - Row loading/flushing for cards and notes.
//! - Single-transaction execution for multi-row edits.

use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::format;

pub mod model;

pub use model::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS col (
    id integer PRIMARY KEY,
    today integer NOT NULL DEFAULT 0
);
INSERT OR IGNORE INTO col (id, today) VALUES (1, 0);
CREATE TABLE IF NOT EXISTS decks (
    id integer PRIMARY KEY,
    name text NOT NULL,
    dyn integer NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS notetypes (
    id integer PRIMARY KEY,
    name text NOT NULL,
    kind integer NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS fields (
    ntid integer NOT NULL,
    ord integer NOT NULL,
    name text NOT NULL,
    PRIMARY KEY (ntid, ord)
);
CREATE TABLE IF NOT EXISTS templates (
    ntid integer NOT NULL,
    ord integer NOT NULL,
    name text NOT NULL,
    PRIMARY KEY (ntid, ord)
);
CREATE TABLE IF NOT EXISTS notes (
    id integer PRIMARY KEY,
    guid text NOT NULL,
    mid integer NOT NULL,
    mod integer NOT NULL,
    usn integer NOT NULL,
    tags text NOT NULL,
    flds text NOT NULL,
    flags integer NOT NULL DEFAULT 0,
    data text NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS cards (
    id integer PRIMARY KEY,
    nid integer NOT NULL,
    did integer NOT NULL,
    ord integer NOT NULL,
    mod integer NOT NULL,
    usn integer NOT NULL,
    type integer NOT NULL,
    queue integer NOT NULL,
    due integer NOT NULL,
    ivl integer NOT NULL,
    factor integer NOT NULL,
    reps integer NOT NULL,
    lapses integer NOT NULL,
    "left" integer NOT NULL,
    odue integer NOT NULL,
    odid integer NOT NULL,
    flags integer NOT NULL,
    data text NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_cards_nid ON cards (nid);
CREATE TABLE IF NOT EXISTS revlog (
    id integer PRIMARY KEY,
    cid integer NOT NULL,
    usn integer NOT NULL,
    ease integer NOT NULL,
    ivl integer NOT NULL,
    lastIvl integer NOT NULL,
    factor integer NOT NULL,
    time integer NOT NULL,
    type integer NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_revlog_cid ON revlog (cid);
"#;

const CARD_COLUMNS: &str =
    r#"id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, "left", odue, odid, flags, data"#;

const NOTE_COLUMNS: &str = "id, guid, mid, mod, usn, tags, flds, flags, data";

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        nid: row.get(1)?,
        did: row.get(2)?,
        ord: row.get(3)?,
        mtime: row.get(4)?,
        usn: row.get(5)?,
        ctype: row.get(6)?,
        queue: row.get(7)?,
        due: row.get(8)?,
        ivl: row.get(9)?,
        factor: row.get(10)?,
        reps: row.get(11)?,
        lapses: row.get(12)?,
        left: row.get(13)?,
        odue: row.get(14)?,
        odid: row.get(15)?,
        flags: row.get(16)?,
        data: row.get(17)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags: String = row.get(5)?;
    let flds: String = row.get(6)?;
    Ok(Note {
        id: row.get(0)?,
        guid: row.get(1)?,
        mid: row.get(2)?,
        mtime: row.get(3)?,
        usn: row.get(4)?,
        tags: Note::split_tags(&tags),
        fields: Note::split_fields(&flds),
        flags: row.get(7)?,
        data: row.get(8)?,
    })
}

/// Current time in epoch seconds, used for `mod` stamps.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct Collection {
    conn: Connection,
}

impl Collection {
    /// Open (or create) a collection file.
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| AppError::io("open_failed", format!("{}: {}", path.display(), e)))?;
        debug!(target: "browsecol::collection", "opened collection at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)?;
        register_sql_functions(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection { &self.conn }

    /// Days elapsed since collection creation, as the scheduler counts them.
    pub fn today(&self) -> AppResult<i64> {
        Ok(self.conn.query_row("SELECT today FROM col WHERE id = 1", [], |r| r.get(0))?)
    }

    pub fn set_today(&self, today: i64) -> AppResult<()> {
        self.conn.execute("UPDATE col SET today = ?1 WHERE id = 1", params![today])?;
        Ok(())
    }

    /// Run `f` inside one transaction. Any error rolls every statement back.
    pub fn transact<T>(&self, f: impl FnOnce(&Self) -> AppResult<T>) -> AppResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(v) => {
                tx.commit()?;
                Ok(v)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    warn!(target: "browsecol::collection", "rollback failed after '{}': {}", e, rb);
                }
                Err(e)
            }
        }
    }

    fn next_id(&self, table: &str) -> AppResult<i64> {
        let sql = format!("SELECT coalesce(max(id), 0) + 1 FROM {}", table);
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }

    // --- decks ---

    pub fn add_deck(&self, name: &str, dynamic: bool) -> AppResult<i64> {
        if self.deck_by_name(name)?.is_some() {
            return Err(AppError::conflict("deck_exists", format!("deck '{}' already exists", name)));
        }
        let id = self.next_id("decks")?;
        self.conn.execute("INSERT INTO decks (id, name, dyn) VALUES (?1, ?2, ?3)", params![id, name, dynamic as i64])?;
        Ok(id)
    }

    pub fn deck(&self, id: i64) -> AppResult<Option<Deck>> {
        Ok(self
            .conn
            .query_row("SELECT id, name, dyn FROM decks WHERE id = ?1", params![id], |r| {
                Ok(Deck { id: r.get(0)?, name: r.get(1)?, dynamic: r.get::<_, i64>(2)? != 0 })
            })
            .optional()?)
    }

    /// Deck names compare case-insensitively, as the host does.
    pub fn deck_by_name(&self, name: &str) -> AppResult<Option<Deck>> {
        Ok(self
            .conn
            .query_row("SELECT id, name, dyn FROM decks WHERE name = ?1 COLLATE NOCASE", params![name.trim()], |r| {
                Ok(Deck { id: r.get(0)?, name: r.get(1)?, dynamic: r.get::<_, i64>(2)? != 0 })
            })
            .optional()?)
    }

    pub fn deck_name(&self, id: i64) -> AppResult<Option<String>> {
        Ok(self.deck(id)?.map(|d| d.name))
    }

    pub fn decks(&self) -> AppResult<Vec<Deck>> {
        let mut stmt = self.conn.prepare("SELECT id, name, dyn FROM decks ORDER BY id")?;
        let rows = stmt.query_map([], |r| Ok(Deck { id: r.get(0)?, name: r.get(1)?, dynamic: r.get::<_, i64>(2)? != 0 }))?;
        let mut out = Vec::new();
        for d in rows { out.push(d?); }
        Ok(out)
    }

    // --- note types ---

    pub fn add_notetype(&self, name: &str, kind: NoteTypeKind, fields: &[&str], templates: &[&str]) -> AppResult<i64> {
        let id = self.next_id("notetypes")?;
        self.conn.execute("INSERT INTO notetypes (id, name, kind) VALUES (?1, ?2, ?3)", params![id, name, kind.as_i64()])?;
        for (ord, f) in fields.iter().enumerate() {
            self.conn.execute("INSERT INTO fields (ntid, ord, name) VALUES (?1, ?2, ?3)", params![id, ord as i64, f])?;
        }
        for (ord, t) in templates.iter().enumerate() {
            self.conn.execute("INSERT INTO templates (ntid, ord, name) VALUES (?1, ?2, ?3)", params![id, ord as i64, t])?;
        }
        Ok(id)
    }

    pub fn notetype(&self, id: i64) -> AppResult<NoteType> {
        let (name, kind): (String, i64) = self
            .conn
            .query_row("SELECT name, kind FROM notetypes WHERE id = ?1", params![id], |r| Ok((r.get(0)?, r.get(1)?)))
            .optional()?
            .ok_or_else(|| AppError::not_found("no_notetype", format!("note type {} not found", id)))?;
        let fields = self.names_by_ord("fields", id)?;
        let templates = self.names_by_ord("templates", id)?;
        Ok(NoteType { id, name, kind: NoteTypeKind::from_i64(kind), fields, templates })
    }

    fn names_by_ord(&self, table: &str, ntid: i64) -> AppResult<Vec<String>> {
        let sql = format!("SELECT name FROM {} WHERE ntid = ?1 ORDER BY ord", table);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![ntid], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for n in rows { out.push(n?); }
        Ok(out)
    }

    pub fn notetypes(&self) -> AppResult<Vec<NoteType>> {
        let ids: Vec<i64> = {
            let mut stmt = self.conn.prepare("SELECT id FROM notetypes ORDER BY id")?;
            let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
            let mut v = Vec::new();
            for id in rows { v.push(id?); }
            v
        };
        ids.into_iter().map(|id| self.notetype(id)).collect()
    }

    // --- notes ---

    pub fn add_note(&self, mid: i64, fields: &[&str], tags: &[&str]) -> AppResult<i64> {
        let id = self.next_id("notes")?;
        let note = Note {
            id,
            guid: format!("g{}", id),
            mid,
            mtime: now_secs(),
            usn: -1,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            flags: 0,
            data: String::new(),
        };
        self.insert_note(&note)?;
        Ok(id)
    }

    pub fn insert_note(&self, note: &Note) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, flags, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![note.id, note.guid, note.mid, note.mtime, note.usn, note.joined_tags(), note.joined_fields(), note.flags, note.data],
        )?;
        Ok(())
    }

    pub fn note(&self, id: i64) -> AppResult<Note> {
        let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        self.conn
            .query_row(&sql, params![id], note_from_row)
            .optional()?
            .ok_or_else(|| AppError::not_found("no_note", format!("note {} not found", id)))
    }

    pub fn note_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.conn.query_row("SELECT count() FROM notes WHERE id = ?1", params![id], |r| r.get::<_, i64>(0))? > 0)
    }

    /// Write every column of `note` back under `note.id`.
    pub fn update_note(&self, note: &Note) -> AppResult<()> {
        let n = self.conn.execute(
            "UPDATE notes SET guid = ?2, mid = ?3, mod = ?4, usn = ?5, tags = ?6, flds = ?7, flags = ?8, data = ?9 WHERE id = ?1",
            params![note.id, note.guid, note.mid, note.mtime, note.usn, note.joined_tags(), note.joined_fields(), note.flags, note.data],
        )?;
        if n == 0 {
            return Err(AppError::not_found("no_note", format!("note {} not found", note.id)));
        }
        Ok(())
    }

    /// Move a note (and its cards) to a new id.
    pub fn change_note_id(&self, old: i64, new: i64) -> AppResult<()> {
        if self.note_exists(new)? {
            return Err(AppError::conflict("note_id_taken", format!("note id {} already in use", new)));
        }
        self.conn.execute("UPDATE notes SET id = ?2, mod = ?3 WHERE id = ?1", params![old, new, now_secs()])?;
        self.conn.execute("UPDATE cards SET nid = ?2 WHERE nid = ?1", params![old, new])?;
        Ok(())
    }

    // --- cards ---

    pub fn add_card(&self, nid: i64, did: i64, ord: i64) -> AppResult<i64> {
        let id = self.next_id("cards")?;
        self.insert_card(&Card::new(id, nid, did, ord))?;
        Ok(id)
    }

    pub fn insert_card(&self, card: &Card) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            CARD_COLUMNS
        );
        self.conn.execute(
            &sql,
            params![
                card.id, card.nid, card.did, card.ord, card.mtime, card.usn, card.ctype, card.queue, card.due,
                card.ivl, card.factor, card.reps, card.lapses, card.left, card.odue, card.odid, card.flags, card.data
            ],
        )?;
        Ok(())
    }

    pub fn card(&self, id: i64) -> AppResult<Card> {
        let sql = format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS);
        self.conn
            .query_row(&sql, params![id], card_from_row)
            .optional()?
            .ok_or_else(|| AppError::not_found("no_card", format!("card {} not found", id)))
    }

    pub fn card_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.conn.query_row("SELECT count() FROM cards WHERE id = ?1", params![id], |r| r.get::<_, i64>(0))? > 0)
    }

    pub fn cards_of_note(&self, nid: i64) -> AppResult<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM cards WHERE nid = ?1 ORDER BY ord")?;
        let rows = stmt.query_map(params![nid], |r| r.get::<_, i64>(0))?;
        let mut out = Vec::new();
        for id in rows { out.push(id?); }
        Ok(out)
    }

    /// Write every column of `card` back under `card.id`, stamping `mod`.
    pub fn update_card(&self, card: &Card) -> AppResult<()> {
        let n = self.conn.execute(
            r#"UPDATE cards SET nid = ?2, did = ?3, ord = ?4, mod = ?5, usn = ?6, type = ?7, queue = ?8, due = ?9,
               ivl = ?10, factor = ?11, reps = ?12, lapses = ?13, "left" = ?14, odue = ?15, odid = ?16, flags = ?17, data = ?18
               WHERE id = ?1"#,
            params![
                card.id, card.nid, card.did, card.ord, now_secs(), card.usn, card.ctype, card.queue, card.due,
                card.ivl, card.factor, card.reps, card.lapses, card.left, card.odue, card.odid, card.flags, card.data
            ],
        )?;
        if n == 0 {
            return Err(AppError::not_found("no_card", format!("card {} not found", card.id)));
        }
        Ok(())
    }

    /// Move a card to a new id, carrying its review history along.
    pub fn change_card_id(&self, old: i64, new: i64) -> AppResult<()> {
        if self.card_exists(new)? {
            return Err(AppError::conflict("card_id_taken", format!("card id {} already in use", new)));
        }
        self.conn.execute("UPDATE cards SET id = ?2, mod = ?3 WHERE id = ?1", params![old, new, now_secs()])?;
        self.conn.execute("UPDATE revlog SET cid = ?2 WHERE cid = ?1", params![old, new])?;
        Ok(())
    }

    // --- review log ---

    pub fn add_review(&self, e: &RevlogEntry) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO revlog (id, cid, usn, ease, ivl, lastIvl, factor, time, type) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![e.id, e.cid, e.usn, e.ease, e.ivl, e.last_ivl, e.factor, e.time, e.rtype],
        )?;
        Ok(())
    }

    /// Evaluate a single-value query against the review log (or any table) for
    /// one card; `None` when the aggregate is NULL.
    pub fn scalar_for_card(&self, sql: &str, cid: i64) -> AppResult<Option<rusqlite::types::Value>> {
        let v: Option<rusqlite::types::Value> = self.conn.query_row(sql, params![cid], |r| r.get(0)).optional()?;
        Ok(v.filter(|v| !matches!(v, rusqlite::types::Value::Null)))
    }
}

fn nth_field(flds: Option<String>, ord: i64) -> Option<String> {
    let o = usize::try_from(ord).ok()?;
    flds?.split(FIELD_SEPARATOR).nth(o).map(str::to_string)
}

/// SQL helpers available to every sort expression.
fn register_sql_functions(conn: &Connection) -> AppResult<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("field_at_index", 2, flags, |ctx| {
        Ok(nth_field(ctx.get(0)?, ctx.get(1)?))
    })?;
    // Field as the browser cell shows it.
    conn.create_scalar_function("field_text_at_index", 2, flags, |ctx| {
        Ok(nth_field(ctx.get(0)?, ctx.get(1)?).map(|f| format::html_to_text_line(&f)))
    })?;
    conn.create_scalar_function("is_bare_number", 1, flags, |ctx| {
        Ok(match ctx.get_raw(0) {
            ValueRef::Text(t) => std::str::from_utf8(t).map(format::is_bare_number).unwrap_or(false),
            _ => false,
        })
    })?;
    Ok(())
}
