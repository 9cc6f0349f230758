//! Core library for the chord dictionary converter.
//!
//! A chord dictionary is kept in three interchangeable representations: a
//! spreadsheet, an SQL script, and an SQLite database. The adapters for each
//! live under [`io`], the shared record type in [`model`], and the conversion
//! pipeline that wires a source adapter to a blank target in [`sync`].

pub mod error;
pub mod io;
pub mod model;
pub mod sync;

pub use error::{Result, ToolError};
