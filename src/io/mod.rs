//! Adapters for the three interchangeable representations of the dictionary.

pub mod database;
pub mod script;
pub mod spreadsheet;
pub mod spreadsheet_write;

use std::path::Path;

/// Lower-cased file extension of `path`, if any.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
