//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::NOTES_DIR_NAME;
use crate::{NoteError, NoteResult};
use medical_sections::DocumentFormat;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    default_format: DocumentFormat,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::InvalidInput` if `data_dir` is empty.
    pub fn new(data_dir: PathBuf, default_format: DocumentFormat) -> NoteResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(NoteError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self {
            data_dir,
            default_format,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.data_dir.join(NOTES_DIR_NAME)
    }

    /// Format requested from the structuring service when the caller gives no role.
    pub fn default_format(&self) -> DocumentFormat {
        self.default_format
    }
}

/// Parse the default document format from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DocumentFormat::Standard`].
///
/// # Errors
///
/// Returns `NoteError::Sections` if the value names no known format.
pub fn default_format_from_env_value(value: Option<String>) -> NoteResult<DocumentFormat> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<DocumentFormat>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}
