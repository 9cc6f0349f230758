use std::fs;
use std::iter;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{CellValue, Chord, FIELD_NAMES};

/// Table holding the dictionary in every SQL representation.
pub const TABLE_NAME: &str = "chord_dictionary";

const KIND: &str = "SQL script";
const BEGIN: &str = "BEGIN TRANSACTION";
const COMMIT: &str = "COMMIT";

/// Schema statement; column order matches [`FIELD_NAMES`].
pub const CREATE_TABLE: &str = concat!(
    r#"CREATE TABLE IF NOT EXISTS "chord_dictionary" ("#,
    r#""id" INTEGER, "#,
    r#""name" TEXT NOT NULL, "#,
    r#""name_alt" TEXT NOT NULL, "#,
    r#""symbol" TEXT NOT NULL UNIQUE, "#,
    r#""symbol_alt" TEXT NOT NULL UNIQUE, "#,
    r#""root_note" TEXT NOT NULL, "#,
    r#""notes" TEXT NOT NULL, "#,
    r#""quality" TEXT NOT NULL, "#,
    r#""common_type" TEXT NOT NULL, "#,
    r#""altered_notes" TEXT, "#,
    r#""added_notes" TEXT, "#,
    r#""bass_note" TEXT NOT NULL, "#,
    r#""lh_fingering" TEXT NOT NULL, "#,
    r#""rh_fingering" TEXT NOT NULL, "#,
    r#""scale_degrees" TEXT NOT NULL, "#,
    r#""music_set" TEXT NOT NULL, "#,
    r#""harmony" TEXT NOT NULL, "#,
    r#""comments" TEXT NOT NULL, "#,
    r#""bimanual" INTEGER NOT NULL DEFAULT 0, "#,
    r#""rootless" INTEGER NOT NULL DEFAULT 0, "#,
    r#"PRIMARY KEY("id" AUTOINCREMENT))"#,
);

/// A chord dictionary expressed as SQL statements.
///
/// The statements between `BEGIN TRANSACTION` and `COMMIT` are owned by the
/// instance; the transaction bracket is added when the script is iterated or
/// rendered, so saving never accumulates extra `COMMIT`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    body: Vec<String>,
}

impl Script {
    /// Schema-only script, ready for [`Script::append`].
    pub fn blank() -> Self {
        Self {
            body: vec![CREATE_TABLE.to_string()],
        }
    }

    /// Loads and splits an existing script file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ToolError::file_format(KIND, path, "file does not exist"));
        }
        let source = fs::read_to_string(path)
            .map_err(|err| ToolError::file_format(KIND, path, err.to_string()))?;
        let script = Self::parse(&source);
        debug!(statement_count = script.body.len(), path = %path.display(), "loaded SQL script");
        Ok(script)
    }

    /// Splits script text into statements. A `BEGIN` that opens the script,
    /// possibly after `PRAGMA`s as `sqlite3 .dump` writes them, and a trailing
    /// `COMMIT` are recognised as the transaction bracket.
    pub fn parse(source: &str) -> Self {
        let mut body = split_statements(source);
        if let Some(index) = body
            .iter()
            .position(|stmt| !is_pragma(stmt))
            .filter(|&index| is_begin(&body[index]))
        {
            body.remove(index);
        }
        if body.last().is_some_and(|stmt| is_commit(stmt)) {
            body.pop();
        }
        Self { body }
    }

    /// Adds one `INSERT` for `chord`.
    pub fn append(&mut self, chord: &Chord) -> Result<()> {
        self.body.push(insert_statement(chord)?);
        Ok(())
    }

    /// Every statement in execution order, without terminators.
    pub fn statements(&self) -> impl Iterator<Item = &str> + '_ {
        iter::once(BEGIN)
            .chain(self.body.iter().map(String::as_str))
            .chain(iter::once(COMMIT))
    }

    /// Number of statements, including the transaction bracket.
    pub fn statement_count(&self) -> usize {
        self.body.len() + 2
    }

    /// The script text: one terminated statement per line.
    pub fn render(&self) -> String {
        self.statements().fold(String::new(), |mut sql, stmt| {
            sql.push_str(stmt);
            sql.push_str(";\n");
            sql
        })
    }

    /// Writes [`Script::render`] to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }
}

fn is_begin(statement: &str) -> bool {
    let normalized = normalize_keywords(statement);
    normalized == "BEGIN" || normalized == BEGIN
}

fn is_pragma(statement: &str) -> bool {
    statement
        .get(..6)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("PRAGMA"))
}

fn is_commit(statement: &str) -> bool {
    let normalized = normalize_keywords(statement);
    matches!(normalized.as_str(), "COMMIT" | "END" | "COMMIT TRANSACTION" | "END TRANSACTION")
}

fn normalize_keywords(statement: &str) -> String {
    statement
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Splits on `;` terminators outside quoted strings, identifiers and `--`
/// comments. Statements are trimmed and empty ones dropped.
fn split_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(open), _) if ch == open => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '\'' | '"') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '-') if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            (None, ';') => {
                push_statement(&mut statements, &mut current);
            }
            (None, _) => current.push(ch),
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

fn insert_statement(chord: &Chord) -> Result<String> {
    let values = FIELD_NAMES
        .iter()
        .zip(chord.to_row())
        .map(|(field, value)| sql_literal(*field, value))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "INSERT INTO \"{TABLE_NAME}\" VALUES ({})",
        values.join(", ")
    ))
}

fn sql_literal(field: &'static str, value: CellValue) -> Result<String> {
    Ok(match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Integer(value) => value.to_string(),
        CellValue::Real(value) => value.to_string(),
        CellValue::Boolean(value) => i64::from(value).to_string(),
        CellValue::Text(text) => quote_text(field, &text)?,
    })
}

/// Single-quotes `text`, doubling embedded quotes. Line breaks and NUL cannot
/// be carried on a one-statement-per-line script.
fn quote_text(field: &'static str, text: &str) -> Result<String> {
    if let Some(bad) = text.chars().find(|ch| matches!(ch, '\n' | '\r' | '\0')) {
        return Err(ToolError::Serialization {
            field,
            reason: format!("contains unsupported character {bad:?}"),
        });
    }
    Ok(format!("'{}'", text.replace('\'', "''")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RootNote;
    use tempfile::tempdir;

    fn sample_chord() -> Chord {
        Chord {
            id: Some(1),
            name: "Major".into(),
            name_alt: "Major triad".into(),
            symbol: "maj".into(),
            symbol_alt: "M".into(),
            root_note: RootNote::C,
            notes: "C E G".into(),
            quality: "major".into(),
            common_type: "triad".into(),
            altered_notes: None,
            added_notes: None,
            bass_note: "C".into(),
            lh_fingering: "5 3 1".into(),
            rh_fingering: "1 3 5".into(),
            scale_degrees: "1 3 5".into(),
            music_set: "[0,4,7]".into(),
            harmony: "tonic".into(),
            comments: "".into(),
            bimanual: false,
            rootless: false,
        }
    }

    #[test]
    fn blank_script_is_schema_only() {
        let script = Script::blank();
        let statements: Vec<&str> = script.statements().collect();
        assert_eq!(statements, vec![BEGIN, CREATE_TABLE, COMMIT]);
        assert!(script.render().ends_with("AUTOINCREMENT));\nCOMMIT;\n"));
    }

    #[test]
    fn appends_quoted_insert() {
        let mut chord = sample_chord();
        chord.comments = "Don't double".into();
        let mut script = Script::blank();
        script.append(&chord).expect("insert built");

        let insert = script.statements().nth(2).expect("insert present");
        assert_eq!(
            insert,
            "INSERT INTO \"chord_dictionary\" VALUES (1, 'Major', 'Major triad', 'maj', 'M', \
             'C', 'C E G', 'major', 'triad', NULL, NULL, 'C', '5 3 1', '1 3 5', '1 3 5', \
             '[0,4,7]', 'tonic', 'Don''t double', 0, 0)"
        );
    }

    #[test]
    fn rejects_line_breaks() {
        let mut chord = sample_chord();
        chord.harmony = "first\nsecond".into();
        let error = Script::blank().append(&chord).unwrap_err();
        assert!(matches!(error, ToolError::Serialization { field: "harmony", .. }));
    }

    #[test]
    fn splits_outside_quotes_and_comments() {
        let source = "-- header; ignored\nBEGIN;\nINSERT INTO t VALUES ('a;b', \"c;d\");\n\
                      INSERT INTO t VALUES ('it''s');\nCOMMIT;\n";
        let script = Script::parse(source);
        let statements: Vec<&str> = script.statements().collect();
        assert_eq!(
            statements,
            vec![
                BEGIN,
                "INSERT INTO t VALUES ('a;b', \"c;d\")",
                "INSERT INTO t VALUES ('it''s')",
                COMMIT,
            ]
        );
    }

    #[test]
    fn bracket_after_leading_pragma_is_recognised() {
        let source = "PRAGMA foreign_keys=OFF;\nBEGIN TRANSACTION;\n\
                      INSERT INTO t VALUES (1);\nCOMMIT;\n";
        let script = Script::parse(source);
        let statements: Vec<&str> = script.statements().collect();
        assert_eq!(
            statements,
            vec![
                BEGIN,
                "PRAGMA foreign_keys=OFF",
                "INSERT INTO t VALUES (1)",
                COMMIT,
            ]
        );
    }

    #[test]
    fn saving_twice_is_byte_identical() {
        let temp_dir = tempdir().expect("temporary directory");
        let first = temp_dir.path().join("first.sql");
        let second = temp_dir.path().join("second.sql");

        let mut script = Script::blank();
        script.append(&sample_chord()).expect("insert built");
        script.save(&first).expect("first save");
        script.save(&first).expect("repeated save");

        let reloaded = Script::open(&first).expect("script reloaded");
        reloaded.save(&second).expect("second save");

        let first_bytes = fs::read(&first).expect("first read");
        let second_bytes = fs::read(&second).expect("second read");
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(reloaded, script);
    }

    #[test]
    fn missing_file_is_a_format_error() {
        let temp_dir = tempdir().expect("temporary directory");
        let error = Script::open(&temp_dir.path().join("absent.sql")).unwrap_err();
        assert!(matches!(error, ToolError::FileFormat { .. }));
    }
}
