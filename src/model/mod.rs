use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ToolError};

/// Number of columns in a chord dictionary row.
pub const FIELD_COUNT: usize = 20;

/// Canonical column order shared by every representation of the dictionary.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "id",
    "name",
    "name_alt",
    "symbol",
    "symbol_alt",
    "root_note",
    "notes",
    "quality",
    "common_type",
    "altered_notes",
    "added_notes",
    "bass_note",
    "lh_fingering",
    "rh_fingering",
    "scale_degrees",
    "music_set",
    "harmony",
    "comments",
    "bimanual",
    "rootless",
];

const HALF_STEPS_PER_OCTAVE: i32 = 12;

/// A single positional value as delivered by one of the adapters.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Absent value (SQL `NULL`, empty spreadsheet cell).
    Null,
    /// Integer literal.
    Integer(i64),
    /// Floating point literal; spreadsheets store every number this way.
    Real(f64),
    /// Boolean literal.
    Boolean(bool),
    /// Plain string literal.
    Text(String),
}

impl CellValue {
    fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(value) => Some(value.to_string()),
            CellValue::Real(value) if is_integral(value) => Some((value as i64).to_string()),
            CellValue::Real(value) => Some(value.to_string()),
            CellValue::Boolean(value) => Some(value.to_string()),
            CellValue::Text(text) => Some(text),
        }
    }

    fn to_integer(&self, field: &'static str) -> Result<Option<i64>> {
        match self {
            value if value.is_blank() => Ok(None),
            CellValue::Integer(value) => Ok(Some(*value)),
            CellValue::Real(value) if is_integral(*value) => Ok(Some(*value as i64)),
            CellValue::Boolean(value) => Ok(Some(i64::from(*value))),
            CellValue::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ToolError::validation(field, format!("'{text}' is not an integer"))),
            other => Err(ToolError::validation(
                field,
                format!("{other:?} is not an integer"),
            )),
        }
    }

    fn to_flag(&self, field: &'static str) -> Result<bool> {
        if let CellValue::Text(text) = self {
            match text.trim().to_ascii_lowercase().as_str() {
                "true" => return Ok(true),
                "false" => return Ok(false),
                _ => {}
            }
        }
        match self.to_integer(field)? {
            None | Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(other) => Err(ToolError::validation(
                field,
                format!("expected 0 or 1, found {other}"),
            )),
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

/// The notated fundamental pitch class of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootNote {
    A,
    ASharp,
    BFlat,
    B,
    C,
    CSharp,
    DFlat,
    D,
    DSharp,
    EFlat,
    E,
    F,
    FSharp,
    GFlat,
    G,
    GSharp,
    AFlat,
}

impl RootNote {
    /// Every accepted spelling, in dictionary order.
    pub const ALL: [RootNote; 17] = [
        RootNote::A,
        RootNote::ASharp,
        RootNote::BFlat,
        RootNote::B,
        RootNote::C,
        RootNote::CSharp,
        RootNote::DFlat,
        RootNote::D,
        RootNote::DSharp,
        RootNote::EFlat,
        RootNote::E,
        RootNote::F,
        RootNote::FSharp,
        RootNote::GFlat,
        RootNote::G,
        RootNote::GSharp,
        RootNote::AFlat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RootNote::A => "A",
            RootNote::ASharp => "A#",
            RootNote::BFlat => "Bb",
            RootNote::B => "B",
            RootNote::C => "C",
            RootNote::CSharp => "C#",
            RootNote::DFlat => "Db",
            RootNote::D => "D",
            RootNote::DSharp => "D#",
            RootNote::EFlat => "Eb",
            RootNote::E => "E",
            RootNote::F => "F",
            RootNote::FSharp => "F#",
            RootNote::GFlat => "Gb",
            RootNote::G => "G",
            RootNote::GSharp => "G#",
            RootNote::AFlat => "Ab",
        }
    }

    /// Pitch class in half steps above C.
    pub fn semitone(self) -> i32 {
        match self {
            RootNote::C => 0,
            RootNote::CSharp | RootNote::DFlat => 1,
            RootNote::D => 2,
            RootNote::DSharp | RootNote::EFlat => 3,
            RootNote::E => 4,
            RootNote::F => 5,
            RootNote::FSharp | RootNote::GFlat => 6,
            RootNote::G => 7,
            RootNote::GSharp | RootNote::AFlat => 8,
            RootNote::A => 9,
            RootNote::ASharp | RootNote::BFlat => 10,
            RootNote::B => 11,
        }
    }

    /// Moves the root by `half_steps` in twelve-tone equal temperament.
    ///
    /// Upward motion lands on sharp spellings, downward motion on flat ones.
    /// A whole number of octaves leaves the spelling untouched.
    pub fn transpose(self, half_steps: i32) -> RootNote {
        if half_steps % HALF_STEPS_PER_OCTAVE == 0 {
            return self;
        }
        let target = (self.semitone() + half_steps).rem_euclid(HALF_STEPS_PER_OCTAVE);
        let sharps = half_steps > 0;
        match target {
            0 => RootNote::C,
            1 if sharps => RootNote::CSharp,
            1 => RootNote::DFlat,
            2 => RootNote::D,
            3 if sharps => RootNote::DSharp,
            3 => RootNote::EFlat,
            4 => RootNote::E,
            5 => RootNote::F,
            6 if sharps => RootNote::FSharp,
            6 => RootNote::GFlat,
            7 => RootNote::G,
            8 if sharps => RootNote::GSharp,
            8 => RootNote::AFlat,
            9 => RootNote::A,
            10 if sharps => RootNote::ASharp,
            10 => RootNote::BFlat,
            _ => RootNote::B,
        }
    }
}

impl FromStr for RootNote {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        RootNote::ALL
            .into_iter()
            .find(|note| note.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                ToolError::validation("root_note", format!("'{value}' is not a known pitch class"))
            })
    }
}

impl fmt::Display for RootNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the chord dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    /// Primary key; assigned by the database when absent.
    pub id: Option<i64>,
    pub name: String,
    pub name_alt: String,
    pub symbol: String,
    pub symbol_alt: String,
    pub root_note: RootNote,
    pub notes: String,
    pub quality: String,
    pub common_type: String,
    pub altered_notes: Option<String>,
    pub added_notes: Option<String>,
    pub bass_note: String,
    pub lh_fingering: String,
    pub rh_fingering: String,
    pub scale_degrees: String,
    pub music_set: String,
    pub harmony: String,
    pub comments: String,
    /// Requires both hands to play.
    pub bimanual: bool,
    /// The voicing omits the root.
    pub rootless: bool,
}

impl Chord {
    /// Builds a chord from a positional row laid out as [`FIELD_NAMES`].
    ///
    /// Short rows are padded with empty values. Numeric columns are coerced
    /// to integers, required text columns must be non-empty, and the root
    /// note must be one of [`RootNote::ALL`].
    pub fn from_row(row: Vec<CellValue>) -> Result<Self> {
        if row.len() > FIELD_COUNT {
            return Err(ToolError::validation(
                "row",
                format!("expected at most {FIELD_COUNT} values, found {}", row.len()),
            ));
        }
        let mut values = row.into_iter();
        let mut next = || values.next().unwrap_or(CellValue::Null);

        let id = next().to_integer("id")?;
        let name = required_text(next(), "name")?;
        let name_alt = text(next());
        let symbol = required_text(next(), "symbol")?;
        let symbol_alt = required_text(next(), "symbol_alt")?;
        let root_note = required_text(next(), "root_note")?.parse()?;

        Ok(Chord {
            id,
            name,
            name_alt,
            symbol,
            symbol_alt,
            root_note,
            notes: text(next()),
            quality: text(next()),
            common_type: text(next()),
            altered_notes: optional_text(next()),
            added_notes: optional_text(next()),
            bass_note: text(next()),
            lh_fingering: text(next()),
            rh_fingering: text(next()),
            scale_degrees: text(next()),
            music_set: text(next()),
            harmony: text(next()),
            comments: text(next()),
            bimanual: next().to_flag("bimanual")?,
            rootless: next().to_flag("rootless")?,
        })
    }

    /// Lays the chord out as a positional row in [`FIELD_NAMES`] order.
    pub fn to_row(&self) -> Vec<CellValue> {
        let text = |value: &str| CellValue::Text(value.to_string());
        let optional = |value: &Option<String>| value.as_deref().map_or(CellValue::Null, text);
        vec![
            self.id.map_or(CellValue::Null, CellValue::Integer),
            text(&self.name),
            text(&self.name_alt),
            text(&self.symbol),
            text(&self.symbol_alt),
            text(self.root_note.as_str()),
            text(&self.notes),
            text(&self.quality),
            text(&self.common_type),
            optional(&self.altered_notes),
            optional(&self.added_notes),
            text(&self.bass_note),
            text(&self.lh_fingering),
            text(&self.rh_fingering),
            text(&self.scale_degrees),
            text(&self.music_set),
            text(&self.harmony),
            text(&self.comments),
            CellValue::Integer(i64::from(self.bimanual)),
            CellValue::Integer(i64::from(self.rootless)),
        ]
    }

    /// Alias for the root note, which names the key the chord is built on.
    pub fn key(&self) -> RootNote {
        self.root_note
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chord(")?;
        for (index, (name, value)) in FIELD_NAMES.iter().zip(self.to_row()).enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match value {
                CellValue::Null => write!(f, "{name}=None")?,
                CellValue::Integer(value) => write!(f, "{name}={value}")?,
                CellValue::Text(value) => write!(f, "{name}={value}")?,
                other => write!(f, "{name}={other:?}")?,
            }
        }
        f.write_str(")")
    }
}

fn text(value: CellValue) -> String {
    value.into_text().unwrap_or_default()
}

fn optional_text(value: CellValue) -> Option<String> {
    value.into_text().filter(|text| !text.is_empty())
}

fn required_text(value: CellValue, field: &'static str) -> Result<String> {
    if value.is_blank() {
        return Err(ToolError::validation(field, "value is required"));
    }
    Ok(text(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn major_row(root_note: &str) -> Vec<CellValue> {
        let mut row: Vec<CellValue> = FIELD_NAMES
            .iter()
            .map(|name| CellValue::Text(format!("{name} value")))
            .collect();
        row[0] = CellValue::Integer(1);
        row[5] = CellValue::Text(root_note.to_string());
        row[18] = CellValue::Integer(0);
        row[19] = CellValue::Integer(0);
        row
    }

    #[test]
    fn accepts_every_pitch_class_spelling() {
        for note in RootNote::ALL {
            let chord = Chord::from_row(major_row(note.as_str())).expect("valid root note");
            assert_eq!(chord.root_note, note);
        }
    }

    #[test]
    fn root_note_is_case_insensitive() {
        let chord = Chord::from_row(major_row("bb")).expect("lowercase flat accepted");
        assert_eq!(chord.root_note, RootNote::BFlat);
        assert_eq!(chord.key().to_string(), "Bb");
        let chord = Chord::from_row(major_row("f#")).expect("lowercase sharp accepted");
        assert_eq!(chord.root_note, RootNote::FSharp);
    }

    #[test]
    fn rejects_unknown_root_note() {
        let error = Chord::from_row(major_row("H")).unwrap_err();
        assert!(matches!(error, ToolError::Validation { field: "root_note", .. }));
    }

    #[test]
    fn rejects_missing_symbol() {
        let mut row = major_row("C");
        row[3] = CellValue::Null;
        let error = Chord::from_row(row).unwrap_err();
        assert!(matches!(error, ToolError::Validation { field: "symbol", .. }));
    }

    #[test]
    fn coerces_spreadsheet_numbers() {
        let mut row = major_row("C");
        row[0] = CellValue::Real(7.0);
        row[18] = CellValue::Real(1.0);
        row[19] = CellValue::Text("0".into());
        let chord = Chord::from_row(row).expect("numeric coercion");
        assert_eq!(chord.id, Some(7));
        assert!(chord.bimanual);
        assert!(!chord.rootless);
    }

    #[test]
    fn rejects_non_numeric_flags() {
        let mut row = major_row("C");
        row[18] = CellValue::Text("sometimes".into());
        let error = Chord::from_row(row).unwrap_err();
        assert!(matches!(error, ToolError::Validation { field: "bimanual", .. }));

        let mut row = major_row("C");
        row[0] = CellValue::Real(1.5);
        assert!(Chord::from_row(row).is_err());
    }

    #[test]
    fn blank_id_and_optional_fields_become_absent() {
        let mut row = major_row("C");
        row[0] = CellValue::Null;
        row[9] = CellValue::Text(String::new());
        row.truncate(12);
        let chord = Chord::from_row(row).expect("short row padded");
        assert_eq!(chord.id, None);
        assert_eq!(chord.altered_notes, None);
        assert_eq!(chord.added_notes, Some("added_notes value".into()));
        assert_eq!(chord.comments, "");
        assert!(!chord.rootless);
    }

    #[test]
    fn row_layout_survives_reconstruction() {
        let chord = Chord::from_row(major_row("Eb")).expect("valid row");
        let rebuilt = Chord::from_row(chord.to_row()).expect("rebuilt row");
        assert_eq!(chord, rebuilt);
    }

    #[test]
    fn display_lists_every_field() {
        let chord = Chord::from_row(major_row("C")).expect("valid row");
        let rendered = chord.to_string();
        assert!(rendered.starts_with("Chord(id=1, name=name value"));
        assert!(rendered.ends_with("bimanual=0, rootless=0)"));
    }

    #[test]
    fn transposes_within_the_octave() {
        assert_eq!(RootNote::C.transpose(1), RootNote::CSharp);
        assert_eq!(RootNote::C.transpose(-1), RootNote::B);
        assert_eq!(RootNote::D.transpose(-1), RootNote::DFlat);
        assert_eq!(RootNote::A.transpose(3), RootNote::C);
        assert_eq!(RootNote::GFlat.transpose(12), RootNote::GFlat);
        assert_eq!(RootNote::GSharp.transpose(-13), RootNote::G);
    }
}
