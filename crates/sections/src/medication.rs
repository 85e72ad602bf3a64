//! Medication records and heuristic medication parsing.
//!
//! Prescriptions reach us in many shapes: a JSON-encoded array, a bare line of text such as
//! `"Aspirin (aspilets) 80mg"`, a list mixing strings and objects, a single object, or legacy
//! objects using `name` instead of `genericName`. This module maps all of them onto a list of
//! [`Medication`] records whose ids are the contiguous sequence `1..=N`.

use crate::coerce::{ensure_string, first_field_string, is_truthy, lookup};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single prescribed medication.
///
/// `id` is positional: it always equals the record's 1-based position in its list and is
/// reassigned whenever the list changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Medication {
    pub id: u32,
    pub generic_name: String,
    pub brand_name: String,
    pub strength: String,
    pub dosage_form: String,
    pub sig_instructions: String,
    pub quantity: String,
    pub refills: String,
    pub special_instructions: String,
}

impl Medication {
    /// Creates a medication with only a generic name set.
    pub fn named(generic_name: impl Into<String>) -> Self {
        Self {
            generic_name: generic_name.into(),
            ..Self::default()
        }
    }

    /// Parses a value that is already a complete, canonical medication record.
    ///
    /// Returns `None` when any field is missing, has the wrong type, or an unknown key is
    /// present.
    pub fn from_well_formed(value: &Value) -> Option<Self> {
        Medication::deserialize(value).ok()
    }

    fn from_parsed(parsed: ParsedMedication) -> Self {
        Self {
            generic_name: parsed.generic_name,
            brand_name: parsed.brand_name,
            strength: parsed.strength,
            ..Self::default()
        }
    }
}

/// Result of [`parse_complex_medication_string`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMedication {
    pub generic_name: String,
    pub brand_name: String,
    pub strength: String,
}

/// Splits free text such as `"Aspirin (aspilets) 80mg"` into generic, brand and strength.
///
/// - With a balanced parenthesis group: generic is the text before the first `(`, brand the
///   text inside the group, strength the text after its `)`.
/// - Without parentheses: when there are at least two tokens and the last one contains a
///   digit, that token is the strength and the rest is the generic name.
/// - Anything else, including unbalanced parentheses, is returned whole as the generic name.
pub fn parse_complex_medication_string(text: &str) -> ParsedMedication {
    let text = text.trim();

    if let Some(open) = text.find('(') {
        let Some(close_offset) = text[open + 1..].find(')') else {
            return whole_generic(text);
        };
        let close = open + 1 + close_offset;

        return ParsedMedication {
            generic_name: text[..open].trim().to_string(),
            brand_name: text[open + 1..close].trim().to_string(),
            strength: text[close + 1..].trim().to_string(),
        };
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.split_last() {
        Some((last, rest)) if !rest.is_empty() && last.chars().any(|c| c.is_ascii_digit()) => {
            ParsedMedication {
                generic_name: rest.join(" "),
                brand_name: String::new(),
                strength: (*last).to_string(),
            }
        }
        _ => whole_generic(text),
    }
}

fn whole_generic(text: &str) -> ParsedMedication {
    ParsedMedication {
        generic_name: text.to_string(),
        ..ParsedMedication::default()
    }
}

/// Normalises any medication representation into a list of canonical records.
///
/// Accepts `null`, JSON-encoded strings, plain text, single objects, and arrays of strings or
/// objects. Arrays keep their length: every element yields exactly one record. Falsy input
/// yields an empty list; every other input yields at least one record.
pub fn normalize_medications(value: &Value) -> Vec<Medication> {
    let mut medications = collect_medications(value);
    renumber(&mut medications);
    medications
}

fn collect_medications(value: &Value) -> Vec<Medication> {
    if !is_truthy(value) {
        return Vec::new();
    }

    match value {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ (Value::Array(_) | Value::Object(_) | Value::String(_))) => {
                collect_medications(&parsed)
            }
            _ => vec![process_string_medication(text)],
        },
        Value::Array(items) => items.iter().map(process_individual_medication).collect(),
        other => vec![process_individual_medication(other)],
    }
}

/// Converts a single free-text medication description.
///
/// Text containing a parenthesis goes through [`parse_complex_medication_string`]; anything
/// else is kept whole as the generic name.
pub fn process_string_medication(text: &str) -> Medication {
    if text.contains('(') {
        Medication::from_parsed(parse_complex_medication_string(text))
    } else {
        Medication::named(text)
    }
}

/// Converts one element of a medication list.
///
/// The returned record carries id `0`; callers renumber the list afterwards.
pub fn process_individual_medication(item: &Value) -> Medication {
    match item {
        Value::Object(_) => medication_from_object(item),
        Value::String(text) => Medication::from_parsed(parse_complex_medication_string(text)),
        Value::Null => Medication::default(),
        other => Medication::from_parsed(parse_complex_medication_string(&ensure_string(other))),
    }
}

fn medication_from_object(item: &Value) -> Medication {
    let mut medication = Medication {
        id: 0,
        generic_name: first_field_string(item, &["genericName", "name", "drug"]),
        brand_name: first_field_string(item, &["brandName", "brand"]),
        strength: first_field_string(item, &["strength", "dose", "dosage"]),
        dosage_form: first_field_string(item, &["dosageForm", "form"]),
        sig_instructions: first_field_string(item, &["sigInstructions", "sig", "instructions"]),
        quantity: first_field_string(item, &["quantity", "qty"]),
        refills: first_field_string(item, &["refills"]),
        special_instructions: first_field_string(item, &["specialInstructions"]),
    };

    let brand_supplied = lookup(item, "brandName").is_some_and(is_truthy)
        || lookup(item, "brand").is_some_and(is_truthy);

    if !brand_supplied && medication.generic_name.contains('(') {
        let parsed = parse_complex_medication_string(&medication.generic_name);
        if !parsed.brand_name.is_empty() || !parsed.strength.is_empty() {
            medication.generic_name = parsed.generic_name;
            medication.brand_name = parsed.brand_name;
            if medication.strength.is_empty() {
                medication.strength = parsed.strength;
            }
        }
    }

    medication
}

/// Reassigns ids so they form the contiguous sequence `1..=N` in list order.
pub fn renumber(medications: &mut [Medication]) {
    for (index, medication) in medications.iter_mut().enumerate() {
        medication.id = u32::try_from(index + 1).unwrap_or(u32::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(generic: &str, brand: &str, strength: &str) -> ParsedMedication {
        ParsedMedication {
            generic_name: generic.into(),
            brand_name: brand.into(),
            strength: strength.into(),
        }
    }

    #[test]
    fn parses_generic_brand_and_strength() {
        assert_eq!(
            parse_complex_medication_string("Aspirin (aspilets) 80mg"),
            parsed("Aspirin", "aspilets", "80mg")
        );
    }

    #[test]
    fn parses_trailing_strength_without_parentheses() {
        assert_eq!(
            parse_complex_medication_string("Metformin 500mg"),
            parsed("Metformin", "", "500mg")
        );
        assert_eq!(
            parse_complex_medication_string("Losartan potassium 50mg"),
            parsed("Losartan potassium", "", "50mg")
        );
    }

    #[test]
    fn keeps_whole_text_when_no_strength_token() {
        assert_eq!(
            parse_complex_medication_string("Paracetamol as needed"),
            parsed("Paracetamol as needed", "", "")
        );
        assert_eq!(parse_complex_medication_string("500mg"), parsed("500mg", "", ""));
    }

    #[test]
    fn unbalanced_parentheses_fall_back_to_generic() {
        assert_eq!(
            parse_complex_medication_string("Amoxicillin (Amoxil 500mg"),
            parsed("Amoxicillin (Amoxil 500mg", "", "")
        );
    }

    #[test]
    fn parentheses_without_strength() {
        assert_eq!(
            parse_complex_medication_string("  Cetirizine (Virlix)  "),
            parsed("Cetirizine", "Virlix", "")
        );
    }

    #[test]
    fn falsy_input_yields_empty_list() {
        assert!(normalize_medications(&json!(null)).is_empty());
        assert!(normalize_medications(&json!("")).is_empty());
        assert!(normalize_medications(&json!([])).is_empty());
    }

    #[test]
    fn json_encoded_string_is_decoded() {
        let encoded = json!(r#"[{"genericName":"Aspirin","strength":"80mg"},"Metformin 500mg"]"#);
        let meds = normalize_medications(&encoded);

        assert_eq!(meds.len(), 2);
        assert_eq!(meds[0].generic_name, "Aspirin");
        assert_eq!(meds[0].strength, "80mg");
        assert_eq!(meds[1].generic_name, "Metformin");
        assert_eq!(meds[1].strength, "500mg");
        assert_eq!(meds[1].id, 2);
    }

    #[test]
    fn plain_string_becomes_single_record() {
        let meds = normalize_medications(&json!("Aspirin (aspilets) 80mg"));
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id, 1);
        assert_eq!(meds[0].generic_name, "Aspirin");
        assert_eq!(meds[0].brand_name, "aspilets");
        assert_eq!(meds[0].strength, "80mg");

        let meds = normalize_medications(&json!("Ibuprofen 200mg"));
        assert_eq!(meds[0].generic_name, "Ibuprofen 200mg");
        assert_eq!(meds[0].strength, "");
    }

    #[test]
    fn numeric_text_is_not_mistaken_for_json() {
        let meds = normalize_medications(&json!("42"));
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].generic_name, "42");
    }

    #[test]
    fn single_object_is_wrapped() {
        let meds = normalize_medications(&json!({"name": "Paracetamol", "quantity": 20}));
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].generic_name, "Paracetamol");
        assert_eq!(meds[0].quantity, "20");
    }

    #[test]
    fn array_length_is_preserved() {
        let input = json!([
            "Aspirin (aspilets) 80mg",
            {"genericName": "Metformin"},
            null,
            7,
            ["nested", "list"]
        ]);
        let meds = normalize_medications(&input);

        assert_eq!(meds.len(), 5);
        let ids: Vec<u32> = meds.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(meds[2], Medication { id: 3, ..Medication::default() });
        assert_eq!(meds[3].generic_name, "7");
    }

    #[test]
    fn incoming_ids_are_replaced() {
        let meds = normalize_medications(&json!([
            {"id": 9, "genericName": "A"},
            {"id": 4, "genericName": "B"}
        ]));
        assert_eq!(meds[0].id, 1);
        assert_eq!(meds[1].id, 2);
    }

    #[test]
    fn legacy_combined_generic_name_is_split() {
        let meds = normalize_medications(&json!([
            {"name": "Aspirin (aspilets) 80mg", "sigInstructions": "1 tab daily"}
        ]));
        assert_eq!(meds[0].generic_name, "Aspirin");
        assert_eq!(meds[0].brand_name, "aspilets");
        assert_eq!(meds[0].strength, "80mg");
        assert_eq!(meds[0].sig_instructions, "1 tab daily");
    }

    #[test]
    fn explicit_brand_prevents_reparse() {
        let meds = normalize_medications(&json!([
            {"genericName": "Aspirin (low dose)", "brandName": "Aspilets"}
        ]));
        assert_eq!(meds[0].generic_name, "Aspirin (low dose)");
        assert_eq!(meds[0].brand_name, "Aspilets");
    }

    #[test]
    fn explicit_strength_wins_over_parsed_strength() {
        let meds = normalize_medications(&json!([
            {"genericName": "Aspirin (aspilets) 80mg", "strength": "100mg"}
        ]));
        assert_eq!(meds[0].generic_name, "Aspirin");
        assert_eq!(meds[0].strength, "100mg");
    }

    #[test]
    fn snake_case_fields_are_accepted() {
        let meds = normalize_medications(&json!([
            {"generic_name": "Losartan", "dosage_form": "tablet", "sig_instructions": "OD"}
        ]));
        assert_eq!(meds[0].generic_name, "Losartan");
        assert_eq!(meds[0].dosage_form, "tablet");
        assert_eq!(meds[0].sig_instructions, "OD");
    }

    #[test]
    fn well_formed_detection_is_strict() {
        let good = json!({
            "id": 1, "genericName": "A", "brandName": "", "strength": "", "dosageForm": "",
            "sigInstructions": "", "quantity": "", "refills": "", "specialInstructions": ""
        });
        assert!(Medication::from_well_formed(&good).is_some());

        let mut extra = good.clone();
        extra["notes"] = json!("x");
        assert!(Medication::from_well_formed(&extra).is_none());

        assert!(Medication::from_well_formed(&json!({"genericName": "A"})).is_none());
    }

    #[test]
    fn renumber_makes_ids_contiguous() {
        let mut meds = vec![Medication::named("a"), Medication::named("b"), Medication::named("c")];
        meds[0].id = 7;
        renumber(&mut meds);
        assert_eq!(meds.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
