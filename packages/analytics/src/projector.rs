//! Projects raw case documents into the classifier's tabular shape.

use case_records_case_models::{CaseField, FeatureRow, FeatureTable, LabeledRow};
use serde_json::Value;

fn owned_text(doc: &Value, field: CaseField) -> Option<String> {
    field.text(doc).map(ToString::to_string)
}

/// Extracts the labelled feature row of a document, or `None` if any of age,
/// ethnicity, location, or case type is missing, blank, or mistyped.
#[must_use]
pub fn project_one(doc: &Value) -> Option<LabeledRow> {
    Some(LabeledRow {
        features: FeatureRow {
            age: CaseField::VictimAge.whole_number(doc)?,
            ethnicity: owned_text(doc, CaseField::VictimEthnicity)?,
            location: owned_text(doc, CaseField::Location)?,
        },
        case_type: owned_text(doc, CaseField::CaseType)?,
    })
}

/// Projects `docs` in order, dropping incomplete records.
#[must_use]
pub fn project(docs: &[Value]) -> FeatureTable {
    let table: FeatureTable = docs.iter().filter_map(project_one).collect();
    if table.len() < docs.len() {
        log::debug!(
            "project: skipped {} incomplete record(s) of {}",
            docs.len() - table.len(),
            docs.len()
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn drops_incomplete_records_and_keeps_order() {
        let docs = [
            json!({ "tipo_do_caso": "Furto", "localizacao": "Centro",
                    "vitima": { "etnia": "Preta", "idade": 30, "sexo": "f" } }),
            json!({ "tipo_do_caso": "Furto", "localizacao": "Centro",
                    "vitima": { "etnia": "Preta" } }),
            json!({ "tipo_do_caso": "Assalto", "localizacao": 7,
                    "vitima": { "etnia": "Branca", "idade": 40 } }),
            json!({ "tipo_do_caso": "Tráfico", "localizacao": "Bairro B",
                    "vitima": { "etnia": "Branca", "idade": 22 } }),
        ];

        let table = project(&docs);
        assert_eq!(table.len(), 2);
        assert_eq!(table.labels(), ["Furto", "Tráfico"]);
        assert_eq!(table.rows()[1].features.age, 22);
    }

    #[test]
    fn empty_or_all_incomplete_is_empty_table() {
        assert!(project(&[]).is_empty());
        assert!(project(&[json!({}), json!({ "vitima": null })]).is_empty());
    }

    #[test]
    fn negative_age_is_incomplete() {
        let doc = json!({ "tipo_do_caso": "Furto", "localizacao": "Centro",
                          "vitima": { "etnia": "Preta", "idade": -1 } });
        assert!(project_one(&doc).is_none());
    }

    #[test]
    fn blank_labels_are_incomplete() {
        let doc = json!({ "tipo_do_caso": " ", "localizacao": "Centro",
                          "vitima": { "etnia": "Preta", "idade": 30 } });
        assert!(project_one(&doc).is_none());
    }
}
