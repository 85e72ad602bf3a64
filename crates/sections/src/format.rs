//! Document format classification.
//!
//! The structuring service does not guarantee a schema, so the format of a payload is decided
//! by an explicit hint when one is given, and otherwise by sniffing which keys are present.
//! Sniffing walks [`SIGNATURES`] in priority order and accepts the first format whose minimal
//! key set matches.

use crate::coerce::{has_key, lookup};
use crate::SectionsError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The four canonical document formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// History & physical note.
    #[default]
    Standard,
    Soap,
    Consultation,
    Prescription,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Standard,
        DocumentFormat::Soap,
        DocumentFormat::Consultation,
        DocumentFormat::Prescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Standard => "standard",
            DocumentFormat::Soap => "soap",
            DocumentFormat::Consultation => "consultation",
            DocumentFormat::Prescription => "prescription",
        }
    }

    /// Interprets a role/format hint, returning `None` when it names no format.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. `history` is an alias
    /// for [`DocumentFormat::Standard`].
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "standard" | "history" => Some(DocumentFormat::Standard),
            "soap" => Some(DocumentFormat::Soap),
            "consultation" => Some(DocumentFormat::Consultation),
            "prescription" => Some(DocumentFormat::Prescription),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = SectionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentFormat::from_hint(s).ok_or_else(|| SectionsError::UnknownFormat(s.to_string()))
    }
}

/// Minimal structural evidence that a payload belongs to a format.
struct FormatSignature {
    format: DocumentFormat,
    matches: fn(&Value) -> bool,
}

/// Detection order. The first matching signature wins.
const SIGNATURES: &[FormatSignature] = &[
    FormatSignature {
        format: DocumentFormat::Soap,
        matches: looks_like_soap,
    },
    FormatSignature {
        format: DocumentFormat::Consultation,
        matches: looks_like_consultation,
    },
    FormatSignature {
        format: DocumentFormat::Prescription,
        matches: looks_like_prescription,
    },
    FormatSignature {
        format: DocumentFormat::Standard,
        matches: looks_like_standard,
    },
];

fn looks_like_soap(raw: &Value) -> bool {
    has_key(raw, "subjective") && has_key(raw, "objective")
}

fn looks_like_consultation(raw: &Value) -> bool {
    has_key(raw, "reasonForConsultation")
}

fn looks_like_prescription(raw: &Value) -> bool {
    has_key(raw, "patientInformation") || has_structured_medications(raw)
}

fn looks_like_standard(raw: &Value) -> bool {
    has_key(raw, "chiefComplaint") || has_key(raw, "historyOfPresentIllness")
}

fn has_structured_medications(raw: &Value) -> bool {
    lookup(raw, "medications")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .is_some_and(Value::is_object)
}

/// Classifies a raw payload into one of the four document formats.
///
/// Priority:
/// 1. a `role` hint naming a format
/// 2. the first matching structural signature
/// 3. [`DocumentFormat::Standard`]
pub fn detect_format(raw: &Value, role: Option<&str>) -> DocumentFormat {
    if let Some(format) = role.and_then(DocumentFormat::from_hint) {
        tracing::debug!(%format, "document format taken from role hint");
        return format;
    }

    let detected = SIGNATURES
        .iter()
        .find(|signature| (signature.matches)(raw))
        .map(|signature| signature.format);

    match detected {
        Some(format) => {
            tracing::debug!(%format, "document format detected from structure");
            format
        }
        None => DocumentFormat::Standard,
    }
}
