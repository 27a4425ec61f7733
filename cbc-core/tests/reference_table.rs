use cbc_core::{AnalysisError, ParameterId, ReferenceRange, ReferenceTable, Status};

#[test]
fn standard_table_covers_every_parameter_in_order() {
    let table = ReferenceTable::standard();
    let ids: Vec<ParameterId> = table.iter().map(|definition| definition.id).collect();
    assert_eq!(ids, ParameterId::ALL.to_vec());

    for definition in table.iter() {
        assert!(definition.range.min <= definition.range.max, "{}", definition.id);
        assert!(!definition.synonyms.is_empty(), "{}", definition.id);
    }
}

#[test]
fn range_lookup_returns_bounds_unit_and_label() {
    let table = ReferenceTable::standard();

    let hb = table.get(ParameterId::Hemoglobin).unwrap();
    assert_eq!(hb.range, ReferenceRange { min: 13.5, max: 17.5 });
    assert_eq!(hb.unit, "g/dL");
    assert_eq!(hb.label, "Hemoglobin (Hb)");

    assert_eq!(
        table.range_of(ParameterId::Platelets),
        Some(ReferenceRange { min: 150.0, max: 450.0 })
    );
}

#[test]
fn classification_is_inclusive_at_both_bounds() {
    let range = ReferenceRange::new(4.5, 11.0).unwrap();
    assert_eq!(range.classify(4.49), Status::Low);
    assert_eq!(range.classify(4.5), Status::Normal);
    assert_eq!(range.classify(11.0), Status::Normal);
    assert_eq!(range.classify(11.01), Status::High);
}

#[test]
fn inverted_or_non_finite_bounds_are_rejected() {
    assert!(matches!(
        ReferenceRange::new(5.0, 1.0),
        Err(AnalysisError::InvalidTable(_))
    ));
    assert!(ReferenceRange::new(f64::NAN, 1.0).is_err());
    assert!(ReferenceRange::new(0.0, f64::INFINITY).is_err());
}

#[test]
fn json_table_round_trips_through_validation() {
    let table = ReferenceTable::from_json_str(
        r#"[
            {"id": "WBC", "label": "Leukocytes", "unit": "G/L", "min": 4.0, "max": 10.0,
             "synonyms": ["Leukocytes", "WBC"]},
            {"id": "Platelets", "label": "Thrombocytes", "unit": "G/L", "min": 150, "max": 400,
             "synonyms": ["Thrombocytes"]}
        ]"#,
    )
    .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.range_of(ParameterId::Wbc).unwrap().max, 10.0);
    assert!(table.get(ParameterId::Rbc).is_none());
}

#[test]
fn json_table_validation_errors() {
    let inverted = r#"[{"id": "RBC", "label": "RBC", "unit": "", "min": 6, "max": 4, "synonyms": ["RBC"]}]"#;
    let duplicate = r#"[
        {"id": "RBC", "label": "RBC", "unit": "", "min": 4, "max": 6, "synonyms": ["RBC"]},
        {"id": "RBC", "label": "Red cells", "unit": "", "min": 4, "max": 6, "synonyms": ["RC"]}
    ]"#;
    let no_synonyms = r#"[{"id": "RBC", "label": "RBC", "unit": "", "min": 4, "max": 6, "synonyms": [" "]}]"#;

    for json in [inverted, duplicate, no_synonyms, "[]"] {
        assert!(
            matches!(ReferenceTable::from_json_str(json), Err(AnalysisError::InvalidTable(_))),
            "{json}"
        );
    }

    assert!(matches!(
        ReferenceTable::from_json_str(r#"[{"id": "Ferritin"}]"#),
        Err(AnalysisError::Parse(_))
    ));
}

#[test]
fn resolve_matches_codes_and_labels_case_insensitively() {
    let table = ReferenceTable::standard();
    assert_eq!(table.resolve("mcv"), Some(ParameterId::Mcv));
    assert_eq!(table.resolve(" Mean Platelet Volume "), Some(ParameterId::Mpv));
    assert_eq!(table.resolve("neutrophils (absolute)"), Some(ParameterId::Neutrophils));
    assert_eq!(table.resolve("ferritin"), None);
}

#[test]
fn table_serializes_as_definition_array() {
    let json = serde_json::to_value(ReferenceTable::standard()).unwrap();
    let first = &json.as_array().unwrap()[0];
    assert_eq!(first["id"], "RBC");
    assert_eq!(first["min"], 4.5);
    assert_eq!(first["unit"], "x10^12/L");
}
