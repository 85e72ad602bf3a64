//! # Scribe Core
//!
//! Core business logic for the clinical scribe.
//!
//! This crate owns everything that touches the file system or a structuring backend:
//! - Note creation, update, listing and deletion with sharded JSON storage
//! - Turning transcripts into normalised notes through a [`StructuringClient`]
//! - Startup configuration ([`CoreConfig`])
//!
//! Normalisation itself lives in `medical-sections`; HTTP concerns belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod notes;
pub mod structuring;
pub mod uuid;

pub use config::{default_format_from_env_value, CoreConfig};
pub use constants::DEFAULT_DATA_DIR;
pub use error::{NoteError, NoteResult};
pub use notes::{Note, NoteService, NoteSummary, NoteTitle, SavedNote};
pub use structuring::{structuring_prompt, CommandClient, StructuringClient, StructuringService};
pub use uuid::NoteId;
