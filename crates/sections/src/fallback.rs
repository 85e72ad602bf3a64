//! Empty and fallback records.

use crate::format::DocumentFormat;
use crate::sections::{
    ConsultationSections, MedicalSections, PrescriptionSections, SoapSections, StandardSections,
};

/// Returns the canonical shape for `format` with every leaf zeroed.
pub fn empty_structure(format: DocumentFormat) -> MedicalSections {
    match format {
        DocumentFormat::Standard => MedicalSections::Standard(StandardSections::default()),
        DocumentFormat::Soap => MedicalSections::Soap(SoapSections::default()),
        DocumentFormat::Consultation => {
            MedicalSections::Consultation(ConsultationSections::default())
        }
        DocumentFormat::Prescription => {
            MedicalSections::Prescription(PrescriptionSections::default())
        }
    }
}

/// Wraps unstructured text in a standard record so nothing is dropped.
///
/// The whole text lands verbatim in `assessment`; every other field is empty.
pub fn fallback_structure(text: &str) -> MedicalSections {
    MedicalSections::Standard(StandardSections {
        assessment: text.to_string(),
        ..StandardSections::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_soap_has_four_empty_fields() {
        let value = empty_structure(DocumentFormat::Soap)
            .to_value()
            .expect("serialise");
        assert_eq!(
            value,
            json!({"subjective": "", "objective": "", "assessment": "", "plan": ""})
        );
    }

    #[test]
    fn empty_prescription_has_zeroed_nested_records() {
        let value = empty_structure(DocumentFormat::Prescription)
            .to_value()
            .expect("serialise");
        assert_eq!(
            value,
            json!({
                "patientInformation": {"name": "", "sex": "", "age": "", "date": ""},
                "medications": [],
                "prescriberInformation": {
                    "name": "", "licenseNumber": "", "s2Number": "", "ptrNumber": ""
                }
            })
        );
    }

    #[test]
    fn fallback_keeps_text_in_assessment() {
        let value = fallback_structure("raw unparsed text")
            .to_value()
            .expect("serialise");
        assert_eq!(
            value,
            json!({
                "chiefComplaint": "",
                "historyOfPresentIllness": "",
                "pastMedicalHistory": "",
                "medications": "",
                "allergies": "",
                "physicalExamination": "",
                "assessment": "raw unparsed text",
                "plan": ""
            })
        );
    }
}
