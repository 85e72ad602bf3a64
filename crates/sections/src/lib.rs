//! Medical section normalisation.
//!
//! This crate turns loosely-typed clinical documentation (AI structuring output, manual edits,
//! persisted note content) into one of four canonical record shapes:
//! - standard history & physical notes
//! - SOAP notes
//! - consultation notes
//! - prescriptions, including structured medication records
//!
//! Everything in the normalisation path is total: malformed input degrades towards emptier or
//! verbatim-text records instead of failing. Errors only exist at the edges (parsing a format
//! name supplied by a caller, serialising output).

pub mod coerce;
pub mod export;
pub mod fallback;
pub mod format;
pub mod medication;
pub mod normalize;
pub mod response;
pub mod sections;
pub mod validation;

pub use coerce::{ensure_string, normalize_object, TemplateField};
pub use export::{format_medication_line, render_plain_text};
pub use fallback::{empty_structure, fallback_structure};
pub use format::{detect_format, DocumentFormat};
pub use medication::{
    normalize_medications, parse_complex_medication_string, Medication, ParsedMedication,
};
pub use normalize::normalize_structured_data;
pub use response::{extract_json_block, parse_structuring_response};
pub use sections::{
    ConsultationSections, MedicalSections, PatientInformation, PrescriberInformation,
    PrescriptionSections, SoapSections, StandardSections,
};
pub use validation::{validate_sections, ValidationWarning};

/// Errors returned by the `medical-sections` crate.
#[derive(Debug, thiserror::Error)]
pub enum SectionsError {
    #[error("unknown document format: {0}")]
    UnknownFormat(String),

    #[error("failed to serialise sections: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Results that can fail with a [`SectionsError`].
pub type SectionsResult<T> = Result<T, SectionsError>;
