//! Saved clinical notes.
//!
//! A note is a normalised [`MedicalSections`] record plus ownership and timestamps. Notes are
//! stored as JSON, one file per note:
//!
//! ```text
//! <data_dir>/notes/<s1>/<s2>/<id>/note.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the note id. Content is normalised on
//! the way in and again on the way out, so a file edited by hand still loads as one of the four
//! canonical shapes.

use crate::config::CoreConfig;
use crate::constants::{MAX_TITLE_CHARS, NOTE_JSON_FILENAME};
use crate::uuid::NoteId;
use crate::{NoteError, NoteResult};
use chrono::{DateTime, Utc};
use medical_sections::{
    normalize_structured_data, validate_sections, DocumentFormat, MedicalSections,
    ValidationWarning,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A note title: trimmed, non-empty, bounded length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteTitle(String);

impl NoteTitle {
    /// # Errors
    ///
    /// Returns [`NoteError::InvalidInput`] if the trimmed input is empty or longer than
    /// [`MAX_TITLE_CHARS`] characters.
    pub fn new(input: impl AsRef<str>) -> NoteResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(NoteError::InvalidInput("title cannot be empty".into()));
        }
        if trimmed.chars().count() > MAX_TITLE_CHARS {
            return Err(NoteError::InvalidInput(format!(
                "title exceeds maximum length of {} characters",
                MAX_TITLE_CHARS
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NoteTitle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// A saved note.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub user_id: String,
    pub title: NoteTitle,
    pub format: DocumentFormat,
    pub content: MedicalSections,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry for a note, without its content.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: NoteId,
    pub user_id: String,
    pub title: NoteTitle,
    pub format: DocumentFormat,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id.clone(),
            title: note.title.clone(),
            format: note.format,
            updated_at: note.updated_at,
        }
    }
}

/// Result of a create or update: the stored note plus any content warnings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SavedNote {
    pub note: Note,
    pub warnings: Vec<ValidationWarning>,
}

/// On-disk representation of `note.json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoteFileWire {
    id: String,
    user_id: String,
    title: String,
    format: DocumentFormat,
    content: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NoteFileWire {
    fn from_note(note: &Note) -> NoteResult<Self> {
        Ok(Self {
            id: note.id.to_string(),
            user_id: note.user_id.clone(),
            title: note.title.to_string(),
            format: note.format,
            content: note.content.to_value()?,
            created_at: note.created_at,
            updated_at: note.updated_at,
        })
    }

    fn into_note(self) -> NoteResult<Note> {
        let id = NoteId::parse(&self.id)?;
        let title = NoteTitle::new(&self.title)?;
        // The stored format is authoritative; blank content would otherwise read back as Standard.
        let content = normalize_structured_data(&self.content, Some(self.format.as_str()));

        Ok(Note {
            id,
            user_id: self.user_id,
            title,
            format: content.format(),
            content,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Strictly parse a `note.json` file.
///
/// Uses `serde_path_to_error` so a schema mismatch names the failing field.
fn parse_note_file(json_text: &str) -> NoteResult<Note> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    let wire: NoteFileWire = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(NoteError::Translation(format!(
                "note.json schema mismatch at {path}: {source}"
            )));
        }
    };

    wire.into_note()
}

fn validate_user_id(user_id: &str) -> NoteResult<String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(NoteError::InvalidInput("user_id cannot be empty".into()));
    }
    Ok(trimmed.to_owned())
}

/// File-backed note storage.
#[derive(Clone, Debug)]
pub struct NoteService {
    cfg: Arc<CoreConfig>,
}

impl NoteService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Saves a new note for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError::InvalidInput`] for an empty user id or an invalid title, or a
    /// storage error if the note cannot be written.
    pub fn create(
        &self,
        user_id: &str,
        title: &str,
        content: MedicalSections,
    ) -> NoteResult<SavedNote> {
        let user_id = validate_user_id(user_id)?;
        let title = NoteTitle::new(title)?;
        let now = Utc::now();

        let note = Note {
            id: NoteId::new(),
            user_id,
            title,
            format: content.format(),
            content,
            created_at: now,
            updated_at: now,
        };

        self.write_note(&note)?;
        tracing::info!(note_id = %note.id, format = %note.format, "created note");

        Ok(saved(note))
    }

    /// Replaces the title and content of an existing note.
    ///
    /// Ownership and creation time are preserved.
    pub fn update(&self, id: &str, title: &str, content: MedicalSections) -> NoteResult<SavedNote> {
        let mut note = self.read(id)?;
        note.title = NoteTitle::new(title)?;
        note.format = content.format();
        note.content = content;
        note.updated_at = Utc::now();

        self.write_note(&note)?;
        tracing::info!(note_id = %note.id, format = %note.format, "updated note");

        Ok(saved(note))
    }

    /// Loads a note by its canonical id.
    ///
    /// # Errors
    ///
    /// - [`NoteError::InvalidInput`] if `id` is not canonical
    /// - [`NoteError::NotFound`] if no note exists under `id`
    /// - [`NoteError::Translation`] if the stored file does not match the note schema
    pub fn read(&self, id: &str) -> NoteResult<Note> {
        let id = NoteId::parse(id)?;
        let path = self.note_path(&id);
        if !path.is_file() {
            return Err(NoteError::NotFound(id.to_string()));
        }

        let contents = fs::read_to_string(&path).map_err(NoteError::FileRead)?;
        parse_note_file(&contents)
    }

    /// Lists notes, newest first, optionally restricted to one user.
    ///
    /// Note files that cannot be read or parsed are logged as warnings and skipped.
    pub fn list(&self, user_id: Option<&str>) -> Vec<NoteSummary> {
        let user_id = user_id.map(str::trim).filter(|u| !u.is_empty());

        let mut notes: Vec<NoteSummary> = note_files(&self.cfg.notes_dir())
            .into_iter()
            .filter_map(|path| {
                let parsed = fs::read_to_string(&path)
                    .map_err(NoteError::FileRead)
                    .and_then(|contents| parse_note_file(&contents));
                match parsed {
                    Ok(note) => Some(note),
                    Err(e) => {
                        tracing::warn!("failed to load note: {} - {}", path.display(), e);
                        None
                    }
                }
            })
            .filter(|note| user_id.map_or(true, |u| note.user_id == u))
            .map(|note| NoteSummary::from(&note))
            .collect();

        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    /// Deletes a note and its directory.
    pub fn delete(&self, id: &str) -> NoteResult<()> {
        let id = NoteId::parse(id)?;
        let dir = id.sharded_dir(&self.cfg.notes_dir());
        if !dir.join(NOTE_JSON_FILENAME).is_file() {
            return Err(NoteError::NotFound(id.to_string()));
        }

        fs::remove_dir_all(&dir).map_err(NoteError::FileDelete)?;
        tracing::info!(note_id = %id, "deleted note");
        Ok(())
    }

    fn note_path(&self, id: &NoteId) -> PathBuf {
        id.sharded_dir(&self.cfg.notes_dir()).join(NOTE_JSON_FILENAME)
    }

    fn write_note(&self, note: &Note) -> NoteResult<()> {
        let notes_dir = self.cfg.notes_dir();
        fs::create_dir_all(&notes_dir).map_err(NoteError::StorageDirCreation)?;

        let note_dir = note.id.sharded_dir(&notes_dir);
        fs::create_dir_all(&note_dir).map_err(NoteError::NoteDirCreation)?;

        let wire = NoteFileWire::from_note(note)?;
        let json = serde_json::to_string_pretty(&wire).map_err(NoteError::Serialization)?;
        fs::write(note_dir.join(NOTE_JSON_FILENAME), json).map_err(NoteError::FileWrite)?;
        Ok(())
    }
}

fn saved(note: Note) -> SavedNote {
    let warnings = validate_sections(&note.content);
    for warning in &warnings {
        tracing::warn!(note_id = %note.id, "{}", warning);
    }
    SavedNote { note, warnings }
}

/// Walks `<notes_dir>/<s1>/<s2>/<id>/note.json`, ignoring anything that does not fit the layout.
fn note_files(notes_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let Ok(s1_entries) = fs::read_dir(notes_dir) else {
        return files;
    };
    for s1 in s1_entries.flatten() {
        let Ok(s2_entries) = fs::read_dir(s1.path()) else {
            continue;
        };
        for s2 in s2_entries.flatten() {
            let Ok(id_entries) = fs::read_dir(s2.path()) else {
                continue;
            };
            for id_entry in id_entries.flatten() {
                let path = id_entry.path().join(NOTE_JSON_FILENAME);
                if path.is_file() {
                    files.push(path);
                }
            }
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use medical_sections::{Medication, PrescriptionSections, SoapSections};
    use serde_json::json;
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir) -> NoteService {
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf(), DocumentFormat::Standard)
            .expect("valid config");
        NoteService::new(Arc::new(cfg))
    }

    fn soap(subjective: &str) -> MedicalSections {
        MedicalSections::Soap(SoapSections {
            subjective: subjective.into(),
            objective: "afebrile".into(),
            ..SoapSections::default()
        })
    }

    #[test]
    fn title_is_trimmed_and_required() {
        assert_eq!(NoteTitle::new("  Follow up  ").expect("title").as_str(), "Follow up");
        assert!(NoteTitle::new("   ").is_err());
        assert!(NoteTitle::new("x".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }

    #[test]
    fn create_writes_sharded_note_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let saved = service
            .create("dr-cruz", "Cough", soap("cough for 3 days"))
            .expect("create should succeed");
        let id = saved.note.id.to_string();

        let path = temp_dir
            .path()
            .join("notes")
            .join(&id[0..2])
            .join(&id[2..4])
            .join(&id)
            .join(NOTE_JSON_FILENAME);
        assert!(path.is_file(), "note.json should exist at {}", path.display());

        let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["format"], "soap");
        assert_eq!(stored["content"]["subjective"], "cough for 3 days");
        assert!(saved.warnings.is_empty());
    }

    #[test]
    fn read_round_trips_created_note() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let saved = service
            .create("dr-cruz", "Cough", soap("cough"))
            .expect("create should succeed");
        let loaded = service
            .read(&saved.note.id.to_string())
            .expect("read should succeed");

        assert_eq!(loaded, saved.note);
    }

    #[test]
    fn create_rejects_blank_user() {
        let temp_dir = TempDir::new().unwrap();
        let err = service(&temp_dir)
            .create("  ", "Cough", soap("cough"))
            .expect_err("blank user should be rejected");
        assert!(matches!(err, NoteError::InvalidInput(msg) if msg.contains("user_id")));
    }

    #[test]
    fn create_reports_missing_generic_names() {
        let temp_dir = TempDir::new().unwrap();
        let mut prescription = PrescriptionSections::default();
        prescription.add_medication(Medication::named("Amoxicillin"));
        prescription.add_medication(Medication::default());

        let saved = service(&temp_dir)
            .create("dr-cruz", "Rx", MedicalSections::Prescription(prescription))
            .expect("create should succeed despite warnings");

        assert_eq!(
            saved.warnings,
            vec![ValidationWarning::MissingGenericName { medication_id: 2 }]
        );
    }

    #[test]
    fn empty_note_keeps_its_format() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let saved = service
            .create(
                "dr-cruz",
                "Blank",
                MedicalSections::Consultation(Default::default()),
            )
            .expect("create should succeed");
        let loaded = service.read(&saved.note.id.to_string()).unwrap();

        assert_eq!(loaded.format, DocumentFormat::Consultation);
        assert_eq!(loaded.content.format(), DocumentFormat::Consultation);
    }

    #[test]
    fn update_preserves_owner_and_creation_time() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let created = service.create("dr-cruz", "Cough", soap("cough")).unwrap().note;
        let updated = service
            .update(&created.id.to_string(), "Cough (revised)", soap("dry cough"))
            .expect("update should succeed")
            .note;

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.user_id, "dr-cruz");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.title.as_str(), "Cough (revised)");
        assert_eq!(service.read(&created.id.to_string()).unwrap(), updated);
    }

    #[test]
    fn read_distinguishes_bad_ids_from_missing_notes() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        assert!(matches!(
            service.read("not-an-id"),
            Err(NoteError::InvalidInput(_))
        ));
        assert!(matches!(
            service.read("550e8400e29b41d4a716446655440000"),
            Err(NoteError::NotFound(_))
        ));
    }

    #[test]
    fn read_rejects_unknown_fields() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let saved = service.create("dr-cruz", "Cough", soap("cough")).unwrap();
        let id = saved.note.id;
        let path = id
            .sharded_dir(&temp_dir.path().join("notes"))
            .join(NOTE_JSON_FILENAME);

        let mut stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        stored["unexpected"] = json!(true);
        fs::write(&path, stored.to_string()).unwrap();

        let err = service.read(&id.to_string()).expect_err("unknown field");
        assert!(matches!(err, NoteError::Translation(msg) if msg.contains("schema mismatch")));
    }

    #[test]
    fn stored_content_is_normalised_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let saved = service
            .create("dr-cruz", "Rx", MedicalSections::Prescription(Default::default()))
            .unwrap();
        let id = saved.note.id;
        let path = id
            .sharded_dir(&temp_dir.path().join("notes"))
            .join(NOTE_JSON_FILENAME);

        let mut stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        stored["content"] = json!({ "medications": ["Aspirin (aspilets) 80mg", "Metformin"] });
        fs::write(&path, stored.to_string()).unwrap();

        let loaded = service.read(&id.to_string()).unwrap();
        let prescription = loaded.content.as_prescription().expect("prescription");
        assert_eq!(prescription.medications.len(), 2);
        assert_eq!(prescription.medications[0].brand_name, "aspilets");
        assert_eq!(prescription.medications[1].id, 2);
    }

    #[test]
    fn list_filters_by_user_and_sorts_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let first = service.create("dr-cruz", "First", soap("a")).unwrap().note;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = service.create("dr-cruz", "Second", soap("b")).unwrap().note;
        std::thread::sleep(std::time::Duration::from_millis(5));
        service.create("dr-reyes", "Other", soap("c")).unwrap();

        let listed = service.list(Some("dr-cruz"));
        let ids: Vec<NoteId> = listed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert_eq!(service.list(None).len(), 3);
        assert_eq!(service.list(Some("  ")).len(), 3);
    }

    #[test]
    fn list_skips_unparsable_files() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);
        service.create("dr-cruz", "Good", soap("a")).unwrap();

        let broken_dir = temp_dir
            .path()
            .join("notes")
            .join("ab")
            .join("cd")
            .join("abcd0000000000000000000000000000");
        fs::create_dir_all(&broken_dir).unwrap();
        fs::write(broken_dir.join(NOTE_JSON_FILENAME), "not json").unwrap();

        let listed = service.list(None);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title.as_str(), "Good");
    }

    #[test]
    fn list_on_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(service(&temp_dir).list(None).is_empty());
    }

    #[test]
    fn delete_removes_note() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let id = service
            .create("dr-cruz", "Cough", soap("cough"))
            .unwrap()
            .note
            .id
            .to_string();
        service.delete(&id).expect("delete should succeed");

        assert!(matches!(service.read(&id), Err(NoteError::NotFound(_))));
        assert!(matches!(service.delete(&id), Err(NoteError::NotFound(_))));
    }
}
