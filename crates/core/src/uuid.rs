//! Note identifiers and sharded storage paths.
//!
//! Notes are stored under sharded directories derived from their identifier. The canonical
//! identifier form is **32 lowercase hexadecimal characters** (no hyphens), the value produced
//! by `Uuid::new_v4().simple().to_string()`. Externally supplied ids must already be canonical.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, a note lives under:
//! `notes_dir/<u[0..2]>/<u[2..4]>/<u>/`

use crate::error::{NoteError, NoteResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Canonical note identifier.
///
/// Once constructed the wrapped UUID is valid, and its string form is always the canonical
/// 32-character lowercase hex representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates an identifier that must already be in canonical form.
    ///
    /// Hyphenated or uppercase forms are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> NoteResult<Self> {
        if Self::is_canonical(input) {
            if let Ok(uuid) = Uuid::parse_str(input) {
                return Ok(Self(uuid));
            }
        }
        Err(NoteError::InvalidInput(format!(
            "note id must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is exactly 32 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/`, where `s1`/`s2` are the first two pairs of hex
    /// characters of the id.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl serde::Serialize for NoteId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl FromStr for NoteId {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_canonical_id() {
        let id = NoteId::new().to_string();
        assert_eq!(id.len(), 32);
        assert!(NoteId::is_canonical(&id));
    }

    #[test]
    fn parse_accepts_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = NoteId::parse(canonical).expect("canonical id");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn parse_rejects_hyphenated_id() {
        let err = NoteId::parse("550e8400-e29b-41d4-a716-446655440000").expect_err("hyphens");
        assert!(matches!(err, NoteError::InvalidInput(msg) if msg.contains("32 lowercase hex")));
    }

    #[test]
    fn parse_rejects_non_canonical_forms() {
        assert!(NoteId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(NoteId::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(NoteId::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(NoteId::parse("550e8400e29b41d4a716446655440zzz").is_err());
        assert!("".parse::<NoteId>().is_err());
    }

    #[test]
    fn sharded_dir_uses_two_levels() {
        let id = NoteId::parse("550e8400e29b41d4a716446655440000").expect("canonical id");
        assert_eq!(
            id.sharded_dir(Path::new("/data/notes")),
            PathBuf::from("/data/notes/55/0e/550e8400e29b41d4a716446655440000")
        );
    }
}
