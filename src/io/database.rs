use std::fs;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::script::{CREATE_TABLE, Script, TABLE_NAME};
use crate::model::{CellValue, Chord, FIELD_COUNT};

const KIND: &str = "SQLite database";

const COLUMNS: &str = r#""id", "name", "name_alt", "symbol", "symbol_alt", "root_note", "notes", "quality", "common_type", "altered_notes", "added_notes", "bass_note", "lh_fingering", "rh_fingering", "scale_degrees", "music_set", "harmony", "comments", "bimanual", "rootless""#;

/// A chord dictionary stored in an embedded SQLite database.
///
/// The connection is released when the value is dropped; an open
/// transaction is rolled back in that case. [`Database::close`] commits it
/// first.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an existing database file holding the dictionary table.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ToolError::file_format(KIND, path, "file does not exist"));
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        match db.verify_schema(KIND, path) {
            Ok(()) => Ok(db),
            Err(err @ ToolError::FileFormat { .. }) => Err(err),
            Err(err) => Err(ToolError::file_format(KIND, path, err.to_string())),
        }
    }

    /// Creates a blank database file with the dictionary schema, replacing
    /// whatever was stored at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self { conn })
    }

    /// Opens an empty in-memory database without any schema.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Whether the dictionary table exists.
    pub fn has_table(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [TABLE_NAME],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether `id` is the table's only primary key column and is declared
    /// `INTEGER`, which makes it the non-null, unique rowid alias.
    pub fn has_integer_key(&self) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) WHERE pk > 0")?;
        let keys = stmt
            .query_map([TABLE_NAME], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches!(
            keys.as_slice(),
            [(name, declared)] if name == "id" && declared.eq_ignore_ascii_case("INTEGER")
        ))
    }

    /// Checks that the dictionary table exists and is keyed on `id`; `kind`
    /// and `path` name the source in the resulting error.
    pub fn verify_schema(&self, kind: &'static str, path: &Path) -> Result<()> {
        let problem = if !self.has_table()? {
            format!("missing table '{TABLE_NAME}'")
        } else if !self.has_integer_key()? {
            "column \"id\" is not the INTEGER PRIMARY KEY".to_string()
        } else {
            return Ok(());
        };
        Err(ToolError::file_format(kind, path, problem))
    }

    /// Executes every statement of `script` in order and returns how many
    /// were run.
    pub fn build(&self, script: &Script) -> Result<usize> {
        let mut executed = 0;
        for statement in script.statements() {
            debug!(statement, "executing script statement");
            self.conn.execute_batch(statement)?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Opens a transaction that [`Database::close`] commits.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    /// Inserts one chord and returns its primary key. A chord without an id
    /// receives the next auto-increment value.
    pub fn append(&self, chord: &Chord) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO \"{TABLE_NAME}\" ({COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ))?;
        stmt.execute(rusqlite::params![
            chord.id,
            chord.name,
            chord.name_alt,
            chord.symbol,
            chord.symbol_alt,
            chord.root_note.as_str(),
            chord.notes,
            chord.quality,
            chord.common_type,
            chord.altered_notes,
            chord.added_notes,
            chord.bass_note,
            chord.lh_fingering,
            chord.rh_fingering,
            chord.scale_degrees,
            chord.music_set,
            chord.harmony,
            chord.comments,
            chord.bimanual,
            chord.rootless,
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lazily iterates the stored chords in primary-key order. Each call
    /// starts a fresh pass.
    pub fn chords(&self) -> ChordRows<'_> {
        ChordRows {
            conn: &self.conn,
            last_id: None,
            finished: false,
        }
    }

    /// Produces the script that rebuilds the current contents: the schema
    /// followed by one `INSERT` per stored chord.
    pub fn dump(&self) -> Result<Script> {
        let mut script = Script::blank();
        for chord in self.chords() {
            script.append(&chord?)?;
        }
        Ok(script)
    }

    /// Commits any open transaction and releases the connection.
    pub fn close(self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

/// Cursor over the dictionary table, fetching one row per step.
#[derive(Debug)]
pub struct ChordRows<'conn> {
    conn: &'conn Connection,
    last_id: Option<i64>,
    finished: bool,
}

impl ChordRows<'_> {
    fn fetch_next(&self) -> Result<Option<Chord>> {
        let row = match self.last_id {
            None => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {COLUMNS} FROM \"{TABLE_NAME}\" ORDER BY \"id\" LIMIT 1"
                ))?;
                stmt.query_row([], row_to_values).optional()?
            }
            Some(last_id) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {COLUMNS} FROM \"{TABLE_NAME}\" WHERE \"id\" > ?1 ORDER BY \"id\" LIMIT 1"
                ))?;
                stmt.query_row([last_id], row_to_values).optional()?
            }
        };
        row.map(Chord::from_row).transpose()
    }
}

impl Iterator for ChordRows<'_> {
    type Item = Result<Chord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.fetch_next() {
            Ok(Some(chord)) => match chord.id {
                Some(id) => {
                    self.last_id = Some(id);
                    Some(Ok(chord))
                }
                None => {
                    self.finished = true;
                    Some(Err(ToolError::validation(
                        "id",
                        "stored row has no primary key value",
                    )))
                }
            },
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn row_to_values(row: &Row) -> rusqlite::Result<Vec<CellValue>> {
    (0..FIELD_COUNT)
        .map(|idx| {
            Ok(match row.get_ref(idx)? {
                ValueRef::Null => CellValue::Null,
                ValueRef::Integer(value) => CellValue::Integer(value),
                ValueRef::Real(value) => CellValue::Real(value),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    CellValue::Text(String::from_utf8_lossy(bytes).into_owned())
                }
            })
        })
        .collect()
}
