//! Constants used throughout the scribe core crate.
//!
//! Path and filename constants live here so storage layout stays consistent.

/// Default directory for scribe data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "/scribe_data";

/// Directory name for persisted notes, under the data directory.
pub const NOTES_DIR_NAME: &str = "notes";

/// Filename for a persisted note.
pub const NOTE_JSON_FILENAME: &str = "note.json";

/// Maximum length of a note title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
