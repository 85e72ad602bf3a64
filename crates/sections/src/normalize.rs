//! Normalisation entry point and format-specific normalisers.
//!
//! `normalize_structured_data` is the single path every payload takes before it is rendered,
//! exported or persisted: detect the format, branch to the matching normaliser, and return a
//! [`MedicalSections`] whose leaves are all strings.

use crate::coerce::{
    ensure_string, field_string, is_blank, lookup, normalize_object, template_string,
    TemplateField,
};
use crate::fallback::{empty_structure, fallback_structure};
use crate::format::{detect_format, DocumentFormat};
use crate::medication::{normalize_medications, renumber, Medication};
use crate::sections::{
    ConsultationSections, MedicalSections, PatientInformation, PrescriberInformation,
    PrescriptionSections, SoapSections, StandardSections,
};
use serde_json::Value;

/// Expected keys of `patientInformation`, with defaults.
pub const PATIENT_TEMPLATE: &[TemplateField] =
    &[("name", ""), ("sex", ""), ("age", ""), ("date", "")];

/// Expected keys of `prescriberInformation`, with defaults.
pub const PRESCRIBER_TEMPLATE: &[TemplateField] = &[
    ("name", ""),
    ("licenseNumber", ""),
    ("s2Number", ""),
    ("ptrNumber", ""),
];

/// Normalises any payload into a canonical record.
///
/// - objects are classified with [`detect_format`] and normalised; objects with no content at
///   all yield [`empty_structure`] for the detected format
/// - strings holding a JSON object are decoded and normalised as objects
/// - blank strings and `null` yield the empty structure for the hinted format
/// - any other text (and arrays or scalars, once coerced to text) is preserved verbatim through
///   [`fallback_structure`]
///
/// Never fails.
pub fn normalize_structured_data(raw: &Value, role: Option<&str>) -> MedicalSections {
    match raw {
        Value::Object(_) => normalize_object_payload(raw, role),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => normalize_object_payload(&parsed, role),
            _ => normalize_text_payload(text, role),
        },
        Value::Null => empty_structure(hinted_format(role)),
        other => normalize_text_payload(&ensure_string(other), role),
    }
}

fn hinted_format(role: Option<&str>) -> DocumentFormat {
    role.and_then(DocumentFormat::from_hint).unwrap_or_default()
}

fn normalize_object_payload(raw: &Value, role: Option<&str>) -> MedicalSections {
    let format = detect_format(raw, role);

    if is_blank(raw) {
        return empty_structure(format);
    }

    match format {
        DocumentFormat::Standard => MedicalSections::Standard(normalize_standard(raw)),
        DocumentFormat::Soap => MedicalSections::Soap(normalize_soap(raw)),
        DocumentFormat::Consultation => MedicalSections::Consultation(normalize_consultation(raw)),
        DocumentFormat::Prescription => MedicalSections::Prescription(normalize_prescription(raw)),
    }
}

fn normalize_text_payload(text: &str, role: Option<&str>) -> MedicalSections {
    if text.trim().is_empty() {
        return empty_structure(hinted_format(role));
    }

    tracing::warn!(
        chars = text.len(),
        "payload is not structured data; keeping text in fallback structure"
    );
    fallback_structure(text)
}

/// Normalises a history & physical payload.
pub fn normalize_standard(raw: &Value) -> StandardSections {
    StandardSections {
        chief_complaint: field_string(raw, "chiefComplaint"),
        history_of_present_illness: field_string(raw, "historyOfPresentIllness"),
        past_medical_history: field_string(raw, "pastMedicalHistory"),
        medications: field_string(raw, "medications"),
        allergies: field_string(raw, "allergies"),
        physical_examination: field_string(raw, "physicalExamination"),
        assessment: field_string(raw, "assessment"),
        plan: field_string(raw, "plan"),
    }
}

/// Normalises a SOAP payload.
pub fn normalize_soap(raw: &Value) -> SoapSections {
    SoapSections {
        subjective: field_string(raw, "subjective"),
        objective: field_string(raw, "objective"),
        assessment: field_string(raw, "assessment"),
        plan: field_string(raw, "plan"),
    }
}

/// Normalises a consultation payload.
pub fn normalize_consultation(raw: &Value) -> ConsultationSections {
    ConsultationSections {
        reason_for_consultation: field_string(raw, "reasonForConsultation"),
        history: field_string(raw, "history"),
        findings: field_string(raw, "findings"),
        impression: field_string(raw, "impression"),
        recommendations: field_string(raw, "recommendations"),
    }
}

/// Normalises a prescription payload.
///
/// A medications array whose every element is already a canonical [`Medication`] is kept as
/// is (only renumbered); anything else is re-derived with [`normalize_medications`].
pub fn normalize_prescription(raw: &Value) -> PrescriptionSections {
    let patient = normalize_object(
        lookup(raw, "patientInformation").unwrap_or(&Value::Null),
        PATIENT_TEMPLATE,
    );
    let prescriber = normalize_object(
        lookup(raw, "prescriberInformation").unwrap_or(&Value::Null),
        PRESCRIBER_TEMPLATE,
    );

    let medications_raw = lookup(raw, "medications").unwrap_or(&Value::Null);
    let medications = match well_formed_medications(medications_raw) {
        Some(mut medications) => {
            renumber(&mut medications);
            medications
        }
        None => normalize_medications(medications_raw),
    };

    PrescriptionSections {
        patient_information: PatientInformation {
            name: template_string(&patient, "name"),
            sex: template_string(&patient, "sex"),
            age: template_string(&patient, "age"),
            date: template_string(&patient, "date"),
        },
        medications,
        prescriber_information: PrescriberInformation {
            name: template_string(&prescriber, "name"),
            license_number: template_string(&prescriber, "licenseNumber"),
            s2_number: template_string(&prescriber, "s2Number"),
            ptr_number: template_string(&prescriber, "ptrNumber"),
        },
    }
}

fn well_formed_medications(value: &Value) -> Option<Vec<Medication>> {
    value
        .as_array()?
        .iter()
        .map(Medication::from_well_formed)
        .collect()
}
