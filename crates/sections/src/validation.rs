//! Non-blocking content checks.
//!
//! Warnings describe content a clinician probably wants to fix before printing. They never
//! prevent a save.

use crate::sections::MedicalSections;
use serde::Serialize;
use std::fmt;

/// A content problem found in a normalised record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// A prescribed medication has no generic name.
    MissingGenericName { medication_id: u32 },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MissingGenericName { medication_id } => {
                write!(f, "medication #{} is missing a generic name", medication_id)
            }
        }
    }
}

/// Collects warnings for a record.
pub fn validate_sections(sections: &MedicalSections) -> Vec<ValidationWarning> {
    let Some(prescription) = sections.as_prescription() else {
        return Vec::new();
    };

    prescription
        .medications
        .iter()
        .filter(|m| m.generic_name.trim().is_empty())
        .map(|m| ValidationWarning::MissingGenericName {
            medication_id: m.id,
        })
        .collect()
}
