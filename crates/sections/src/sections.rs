//! Canonical medical section records.
//!
//! [`MedicalSections`] holds exactly one of the four document shapes. It serialises untagged,
//! so the JSON form is the flat shape itself (for example `{"subjective": ..., "objective":
//! ...}`), which is what persisted notes and API consumers exchange.
//!
//! Deserialising a `MedicalSections` accepts any JSON value and runs it through
//! [`normalize_structured_data`](crate::normalize_structured_data); loose payloads are
//! normalised on the way in rather than rejected.

use crate::format::DocumentFormat;
use crate::medication::{renumber, Medication};
use crate::normalize::normalize_structured_data;
use crate::SectionsResult;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// History & physical note.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardSections {
    pub chief_complaint: String,
    pub history_of_present_illness: String,
    pub past_medical_history: String,
    pub medications: String,
    pub allergies: String,
    pub physical_examination: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoapSections {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSections {
    pub reason_for_consultation: String,
    pub history: String,
    pub findings: String,
    pub impression: String,
    pub recommendations: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInformation {
    pub name: String,
    pub sex: String,
    pub age: String,
    pub date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriberInformation {
    pub name: String,
    pub license_number: String,
    pub s2_number: String,
    pub ptr_number: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSections {
    pub patient_information: PatientInformation,
    pub medications: Vec<Medication>,
    pub prescriber_information: PrescriberInformation,
}

impl PrescriptionSections {
    /// Appends a medication and renumbers the list.
    ///
    /// Returns the id assigned to the new entry.
    pub fn add_medication(&mut self, medication: Medication) -> u32 {
        self.medications.push(medication);
        renumber(&mut self.medications);
        self.medications.last().map(|m| m.id).unwrap_or_default()
    }

    /// Removes the medication with the given positional id and renumbers the rest.
    pub fn remove_medication(&mut self, id: u32) -> Option<Medication> {
        let index = self.medications.iter().position(|m| m.id == id)?;
        let removed = self.medications.remove(index);
        renumber(&mut self.medications);
        Some(removed)
    }

    /// Replaces the medication with the given positional id, keeping its position.
    ///
    /// Returns `false` when no medication has that id.
    pub fn update_medication(&mut self, id: u32, medication: Medication) -> bool {
        let Some(slot) = self.medications.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        *slot = Medication { id, ..medication };
        true
    }
}

/// A normalised clinical document: exactly one of the four canonical shapes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MedicalSections {
    Standard(StandardSections),
    Soap(SoapSections),
    Consultation(ConsultationSections),
    Prescription(PrescriptionSections),
}

impl MedicalSections {
    /// Returns the format of the populated shape.
    pub fn format(&self) -> DocumentFormat {
        match self {
            MedicalSections::Standard(_) => DocumentFormat::Standard,
            MedicalSections::Soap(_) => DocumentFormat::Soap,
            MedicalSections::Consultation(_) => DocumentFormat::Consultation,
            MedicalSections::Prescription(_) => DocumentFormat::Prescription,
        }
    }

    pub fn as_prescription(&self) -> Option<&PrescriptionSections> {
        match self {
            MedicalSections::Prescription(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_prescription_mut(&mut self) -> Option<&mut PrescriptionSections> {
        match self {
            MedicalSections::Prescription(p) => Some(p),
            _ => None,
        }
    }

    /// Serialises the record into its flat JSON shape.
    pub fn to_value(&self) -> SectionsResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Default for MedicalSections {
    fn default() -> Self {
        MedicalSections::Standard(StandardSections::default())
    }
}

impl<'de> Deserialize<'de> for MedicalSections {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(normalize_structured_data(&raw, None))
    }
}
