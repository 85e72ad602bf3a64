//! Plain-text rendering of normalised records.
//!
//! Used for clipboard export and for the text export endpoint. Each non-empty section is
//! written under an upper-case heading; sections with no content are omitted.

use crate::medication::Medication;
use crate::sections::{
    ConsultationSections, MedicalSections, PrescriptionSections, SoapSections, StandardSections,
};

/// Renders a record as plain text.
pub fn render_plain_text(sections: &MedicalSections) -> String {
    let blocks = match sections {
        MedicalSections::Standard(s) => standard_blocks(s),
        MedicalSections::Soap(s) => soap_blocks(s),
        MedicalSections::Consultation(s) => consultation_blocks(s),
        MedicalSections::Prescription(s) => prescription_blocks(s),
    };

    blocks.join("\n\n")
}

fn section(heading: &str, body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(format!("{}:\n{}", heading, body))
    }
}

fn standard_blocks(s: &StandardSections) -> Vec<String> {
    [
        section("CHIEF COMPLAINT", &s.chief_complaint),
        section("HISTORY OF PRESENT ILLNESS", &s.history_of_present_illness),
        section("PAST MEDICAL HISTORY", &s.past_medical_history),
        section("MEDICATIONS", &s.medications),
        section("ALLERGIES", &s.allergies),
        section("PHYSICAL EXAMINATION", &s.physical_examination),
        section("ASSESSMENT", &s.assessment),
        section("PLAN", &s.plan),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn soap_blocks(s: &SoapSections) -> Vec<String> {
    [
        section("SUBJECTIVE", &s.subjective),
        section("OBJECTIVE", &s.objective),
        section("ASSESSMENT", &s.assessment),
        section("PLAN", &s.plan),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn consultation_blocks(s: &ConsultationSections) -> Vec<String> {
    [
        section("REASON FOR CONSULTATION", &s.reason_for_consultation),
        section("HISTORY", &s.history),
        section("FINDINGS", &s.findings),
        section("IMPRESSION", &s.impression),
        section("RECOMMENDATIONS", &s.recommendations),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn labelled_lines(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{}: {}", label, value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn prescription_blocks(s: &PrescriptionSections) -> Vec<String> {
    let patient = &s.patient_information;
    let prescriber = &s.prescriber_information;

    let rx = s
        .medications
        .iter()
        .map(format_medication_entry)
        .collect::<Vec<_>>()
        .join("\n");

    [
        section(
            "PATIENT",
            &labelled_lines(&[
                ("Name", patient.name.as_str()),
                ("Sex", patient.sex.as_str()),
                ("Age", patient.age.as_str()),
                ("Date", patient.date.as_str()),
            ]),
        ),
        section("RX", &rx),
        section(
            "PRESCRIBER",
            &labelled_lines(&[
                ("Name", prescriber.name.as_str()),
                ("License No.", prescriber.license_number.as_str()),
                ("S2 No.", prescriber.s2_number.as_str()),
                ("PTR No.", prescriber.ptr_number.as_str()),
            ]),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Formats the headline of a medication: `Generic (Brand) Strength DosageForm`.
///
/// Empty parts are skipped, so a record with only a generic name renders as that name.
pub fn format_medication_line(medication: &Medication) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !medication.generic_name.trim().is_empty() {
        parts.push(medication.generic_name.trim().to_string());
    }
    if !medication.brand_name.trim().is_empty() {
        parts.push(format!("({})", medication.brand_name.trim()));
    }
    for extra in [&medication.strength, &medication.dosage_form] {
        if !extra.trim().is_empty() {
            parts.push(extra.trim().to_string());
        }
    }

    parts.join(" ")
}

fn format_medication_entry(medication: &Medication) -> String {
    let mut lines = vec![format!(
        "{}. {}",
        medication.id,
        format_medication_line(medication)
    )];

    if !medication.sig_instructions.trim().is_empty() {
        lines.push(format!("   Sig: {}", medication.sig_instructions.trim()));
    }

    let supply = labelled_lines(&[
        ("Qty", medication.quantity.as_str()),
        ("Refills", medication.refills.as_str()),
    ]);
    if !supply.is_empty() {
        lines.push(format!("   {}", supply.replace('\n', ", ")));
    }

    if !medication.special_instructions.trim().is_empty() {
        lines.push(format!("   Note: {}", medication.special_instructions.trim()));
    }

    lines.join("\n")
}
