use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{Result, ToolError};
use crate::io::database::Database;
use crate::io::extension;
use crate::io::script::Script;
use crate::io::spreadsheet::Spreadsheet;
use crate::model::Chord;

/// The three interchangeable representations of the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.ods` or `.xlsx` document.
    Spreadsheet,
    /// `.sql` statement script.
    Script,
    /// `.db`, `.sqlite` or `.sqlite3` database file.
    Database,
}

impl Format {
    /// Maps a file extension to a format, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        match extension(path).as_deref() {
            Some("ods" | "xlsx") => Ok(Format::Spreadsheet),
            Some("sql") => Ok(Format::Script),
            Some("db" | "sqlite" | "sqlite3") => Ok(Format::Database),
            Some(other) => Err(ToolError::Usage(format!(
                "unsupported file extension '.{other}' for {}",
                path.display()
            ))),
            None => Err(ToolError::Usage(format!(
                "cannot infer a format for {}: missing file extension",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Spreadsheet => write!(f, "spreadsheet"),
            Format::Script => write!(f, "sql"),
            Format::Database => write!(f, "sqlite"),
        }
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    pub from: Format,
    pub to: Format,
    /// Number of chords written to the target.
    pub records: usize,
}

/// Converts `input` into `output`, choosing both formats from the file
/// extensions.
pub fn convert(input: &Path, output: &Path) -> Result<ConversionReport> {
    let from = Format::from_path(input)?;
    let to = Format::from_path(output)?;
    convert_between(input, from, output, to)
}

/// Converts between explicitly selected formats. Adapter failures are
/// wrapped in [`ToolError::Conversion`] naming the attempted pair.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), %from, %to)
)]
pub fn convert_between(
    input: &Path,
    from: Format,
    output: &Path,
    to: Format,
) -> Result<ConversionReport> {
    if same_file(input, output) {
        return Err(ToolError::Usage(format!(
            "input and output both name {}",
            input.display()
        )));
    }

    let records = transfer(input, from, output, to).map_err(|source| ToolError::Conversion {
        from: from.to_string(),
        to: to.to_string(),
        source: Box::new(source),
    })?;
    info!(records, "conversion finished");
    Ok(ConversionReport { from, to, records })
}

fn transfer(input: &Path, from: Format, output: &Path, to: Format) -> Result<usize> {
    match from {
        Format::Spreadsheet => {
            let sheet = Spreadsheet::open(input)?;
            info!(row_count = sheet.len(), "read rows from spreadsheet");
            write_chords(sheet.chords(), output, to)
        }
        Format::Script => {
            let script = Script::open(input)?;
            let db = Database::open_in_memory()?;
            let executed = db.build(&script)?;
            debug!(executed, "script replayed into scratch database");
            db.verify_schema("SQL script", input)?;
            let records = write_chords(db.chords(), output, to)?;
            db.close()?;
            Ok(records)
        }
        Format::Database => {
            let db = Database::open(input)?;
            let records = if to == Format::Script {
                let script = db.dump()?;
                script.save(output)?;
                db.chords().count()
            } else {
                write_chords(db.chords(), output, to)?
            };
            db.close()?;
            Ok(records)
        }
    }
}

fn write_chords(
    chords: impl Iterator<Item = Result<Chord>>,
    output: &Path,
    to: Format,
) -> Result<usize> {
    let mut target = Target::blank(output, to)?;
    let mut records = 0;
    for chord in chords {
        target.append(&chord?)?;
        records += 1;
    }
    target.finish(output)?;
    Ok(records)
}

/// Blank output adapter being filled during a conversion.
enum Target {
    Spreadsheet(Spreadsheet),
    Script(Script),
    Database(Database),
}

impl Target {
    fn blank(output: &Path, to: Format) -> Result<Self> {
        Ok(match to {
            Format::Spreadsheet => Target::Spreadsheet(Spreadsheet::blank()),
            Format::Script => Target::Script(Script::blank()),
            Format::Database => {
                let db = Database::create(output)?;
                db.begin()?;
                Target::Database(db)
            }
        })
    }

    fn append(&mut self, chord: &Chord) -> Result<()> {
        match self {
            Target::Spreadsheet(sheet) => sheet.append(chord),
            Target::Script(script) => script.append(chord)?,
            Target::Database(db) => {
                db.append(chord)?;
            }
        }
        Ok(())
    }

    fn finish(self, output: &Path) -> Result<()> {
        match self {
            Target::Spreadsheet(sheet) => sheet.save(output),
            Target::Script(script) => script.save(output),
            Target::Database(db) => db.close(),
        }
    }
}

fn same_file(input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    }
}
