use cbc_core::{
    AnalysisConfig, AnalysisError, ExtractedValues, FindingValue, ParameterId, ReferenceTable,
    SampleMetadata, StorageCondition,
};
use chrono::{Duration, TimeZone, Utc};

#[test]
fn values_reject_negative_and_non_finite_numbers() {
    let mut values = ExtractedValues::new();
    assert!(values.insert(ParameterId::Rbc, 0.0).is_ok());
    assert!(matches!(
        values.insert(ParameterId::Wbc, -0.1),
        Err(AnalysisError::InvalidValue {
            parameter: ParameterId::Wbc,
            ..
        })
    ));
    assert!(values.insert(ParameterId::Wbc, f64::NAN).is_err());
    assert!(values.insert(ParameterId::Wbc, f64::INFINITY).is_err());
    assert_eq!(values.len(), 1);
}

#[test]
fn values_deserialize_with_the_same_invariant() {
    let values: ExtractedValues = serde_json::from_str(r#"{"RBC": 5.2, "MPV": 9.0}"#).unwrap();
    assert_eq!(values.get(ParameterId::Rbc), Some(5.2));
    assert_eq!(values.get(ParameterId::Mpv), Some(9.0));

    assert!(serde_json::from_str::<ExtractedValues>(r#"{"RBC": -5.2}"#).is_err());
    assert!(serde_json::from_str::<ExtractedValues>(r#"{"Ferritin": 30}"#).is_err());
}

#[test]
fn values_iterate_in_parameter_order() {
    let values = ExtractedValues::from_pairs([
        (ParameterId::Platelets, 200.0),
        (ParameterId::Rbc, 5.0),
        (ParameterId::Mcv, 90.0),
    ])
    .unwrap();
    let ids: Vec<ParameterId> = values.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![ParameterId::Rbc, ParameterId::Mcv, ParameterId::Platelets]);
}

#[test]
fn manual_entries_resolve_against_the_table() {
    let table = ReferenceTable::standard();
    let values =
        ExtractedValues::from_manual(&table, [("WBC", 6.1), ("Red Blood Cell Count", 4.9)]).unwrap();
    assert_eq!(values.get(ParameterId::Wbc), Some(6.1));
    assert_eq!(values.get(ParameterId::Rbc), Some(4.9));

    let err = ExtractedValues::from_manual(&table, [("CRP", 3.0)]).unwrap_err();
    assert_eq!(err.to_string(), "unknown parameter `CRP`");
}

#[test]
fn parameter_codes_parse_case_insensitively() {
    assert_eq!("rdw".parse::<ParameterId>().unwrap(), ParameterId::Rdw);
    assert_eq!(" Platelets ".parse::<ParameterId>().unwrap(), ParameterId::Platelets);
    assert!("platelet".parse::<ParameterId>().is_err());
    assert_eq!(ParameterId::Mchc.to_string(), "MCHC");
}

#[test]
fn storage_condition_accepts_common_spellings() {
    for text in ["room_temperature", "room-temperature", "Room Temperature", "ROOMTEMPERATURE"] {
        assert_eq!(
            text.parse::<StorageCondition>().unwrap(),
            StorageCondition::RoomTemperature
        );
    }
    assert_eq!("frozen".parse::<StorageCondition>().unwrap(), StorageCondition::Frozen);
    assert!(matches!(
        "boiled".parse::<StorageCondition>(),
        Err(AnalysisError::InvalidMetadata(_))
    ));
}

#[test]
fn metadata_rejects_negative_age() {
    assert!(SampleMetadata::new(-1.0, StorageCondition::Refrigerated).is_err());
    assert!(SampleMetadata::new(f64::NAN, StorageCondition::Refrigerated).is_err());

    let metadata = SampleMetadata::default();
    assert_eq!(metadata.age_hours, 0.0);
    assert_eq!(metadata.storage, StorageCondition::RoomTemperature);
}

#[test]
fn metadata_deserializes_with_the_same_invariant() {
    let metadata: SampleMetadata =
        serde_json::from_str(r#"{"age_hours": 80.0, "storage": "refrigerated"}"#).unwrap();
    assert_eq!(metadata.age_hours, 80.0);
    assert_eq!(metadata.storage, StorageCondition::Refrigerated);

    let err = serde_json::from_str::<SampleMetadata>(r#"{"age_hours": -4.0, "storage": "frozen"}"#)
        .unwrap_err();
    assert!(err.to_string().contains("non-negative"), "{err}");
}

#[test]
fn config_rejects_unusable_thresholds() {
    assert!(AnalysisConfig::default().validate().is_ok());

    let negative = AnalysisConfig {
        rule_of_threes_hb_tolerance: -1.0,
        ..AnalysisConfig::default()
    };
    let zero = AnalysisConfig {
        rule_of_threes_hct_tolerance: 0.0,
        ..AnalysisConfig::default()
    };
    let inverted = AnalysisConfig {
        microcytic_mcv_below: 105.0,
        macrocytic_mcv_above: 95.0,
        ..AnalysisConfig::default()
    };
    let infinite = AnalysisConfig {
        stale_sample_hours: f64::INFINITY,
        ..AnalysisConfig::default()
    };
    for config in [negative, zero, inverted, infinite] {
        assert!(
            matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))),
            "{config:?}"
        );
    }
}

#[test]
fn metadata_age_derives_from_collection_time() {
    let collected = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
    let now = collected + Duration::hours(36) + Duration::minutes(30);

    let metadata =
        SampleMetadata::from_collection_time(collected, now, StorageCondition::Refrigerated)
            .unwrap();
    assert_eq!(metadata.age_hours, 36.5);

    assert!(SampleMetadata::from_collection_time(now, collected, StorageCondition::Frozen).is_err());
}

#[test]
fn finding_values_display_compactly() {
    assert_eq!(FindingValue::Numeric(312.0).to_string(), "312");
    assert_eq!(FindingValue::Numeric(4.1).to_string(), "4.1");
    assert_eq!(FindingValue::Numeric(23.95).to_string(), "23.95");
    assert_eq!(FindingValue::Label("Violated".to_string()).to_string(), "Violated");
}

#[test]
fn finding_values_serialize_untagged() {
    assert_eq!(serde_json::to_string(&FindingValue::Numeric(9.8)).unwrap(), "9.8");
    assert_eq!(
        serde_json::to_string(&FindingValue::Label("Microcytic".to_string())).unwrap(),
        "\"Microcytic\""
    );
}
