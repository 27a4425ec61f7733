use cbc_analysis::{parse_config_json, Analyzer};
use cbc_core::{
    AnalysisConfig, AnalysisError, ExtractedValues, ParameterId, ReferenceTable, RuleId,
    SampleMetadata, StorageCondition, Subject,
};

#[test]
fn empty_input_yields_empty_report() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_values(ExtractedValues::new(), SampleMetadata::default());

    assert!(report.values.is_empty());
    assert!(report.quality_issues.is_empty());
    assert!(report.findings.all.is_empty());
    assert!(report.findings.abnormal.is_empty());
    assert!(report.follow_up.is_none());
    assert!(!report.has_abnormal());
}

#[test]
fn unrecognised_text_yields_empty_report() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_text("scan unreadable", SampleMetadata::default());
    assert!(report.findings.all.is_empty());
}

#[test]
fn normal_panel_has_no_abnormal_findings() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_text(
        "RBC 5.0\nHemoglobin 15.0\nHematocrit 45.0\nWBC 7.0\nPlatelets 250",
        SampleMetadata::default(),
    );

    assert_eq!(report.findings.all.len(), 5);
    assert!(report.findings.abnormal.is_empty());
    assert!(report.follow_up.is_none());
}

#[test]
fn abnormal_subset_preserves_order_and_adds_follow_up() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let report = analyzer.analyze_text(
        "RBC 5.0\nHemoglobin 10.0\nHematocrit 45.0\nWBC 7.0",
        SampleMetadata::default(),
    );

    let abnormal: Vec<Subject> = report
        .findings
        .abnormal
        .iter()
        .map(|finding| finding.subject)
        .collect();
    assert_eq!(
        abnormal,
        vec![
            Subject::Parameter(ParameterId::Hemoglobin),
            Subject::Rule(RuleId::RuleOfThrees),
            Subject::Rule(RuleId::AnemiaEvaluation),
            Subject::Rule(RuleId::SmearRecommendation),
        ]
    );
    assert_eq!(report.findings.all.len(), 7);
    assert!(report.follow_up.unwrap().contains("immunoglobulins"));
}

#[test]
fn repeated_analysis_is_identical() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let metadata = SampleMetadata::new(96.0, StorageCondition::Frozen).unwrap();
    let text = "RBC 3.9\nHb 10.1\nHCT 33\nMCV 104\nMPV 11.2\nLymphocytes 0.7";

    let first = analyzer.analyze_text(text, metadata);
    let second = analyzer.analyze_text(text, metadata);

    assert_eq!(first.values, second.values);
    assert_eq!(first.quality_issues, second.quality_issues);
    assert_eq!(first.findings, second.findings);
    assert_eq!(
        serde_json::to_string(&first.findings).unwrap(),
        serde_json::to_string(&second.findings).unwrap()
    );
}

#[test]
fn manual_json_accepts_codes_and_labels() {
    let analyzer = Analyzer::with_defaults().unwrap();
    let values = analyzer
        .parse_manual_json(r#"{"rbc": 4.8, "Platelet Count": 210, "Hemoglobin (Hb)": 14.0}"#)
        .unwrap();

    assert_eq!(values.get(ParameterId::Rbc), Some(4.8));
    assert_eq!(values.get(ParameterId::Platelets), Some(210.0));
    assert_eq!(values.get(ParameterId::Hemoglobin), Some(14.0));
}

#[test]
fn manual_json_rejects_unknown_and_negative_entries() {
    let analyzer = Analyzer::with_defaults().unwrap();

    let err = analyzer.parse_manual_json(r#"{"Ferritin": 30}"#).unwrap_err();
    assert!(matches!(err, AnalysisError::UnknownParameter(name) if name == "Ferritin"));

    let err = analyzer.parse_manual_json(r#"{"WBC": -1.0}"#).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InvalidValue {
            parameter: ParameterId::Wbc,
            ..
        }
    ));

    let err = analyzer.parse_manual_json("[1, 2]").unwrap_err();
    assert!(matches!(err, AnalysisError::Parse(_)));
}

#[test]
fn partial_config_keeps_defaults() {
    let config = parse_config_json(r#"{"stale_sample_hours": 48}"#).unwrap();
    assert_eq!(config.stale_sample_hours, 48.0);
    assert_eq!(config.rule_of_threes_hb_tolerance, 1.0);
    assert_eq!(config.macrocytic_mcv_above, 100.0);
}

#[test]
fn invalid_thresholds_are_rejected() {
    let err = parse_config_json(r#"{"microcytic_mcv_below": 110}"#).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));

    let config = AnalysisConfig {
        rule_of_threes_hb_tolerance: -0.5,
        ..AnalysisConfig::default()
    };
    assert!(matches!(
        Analyzer::new(ReferenceTable::standard(), config),
        Err(AnalysisError::InvalidConfig(_))
    ));
}

#[test]
fn custom_table_drives_extraction_and_rules() {
    let table = ReferenceTable::from_json_str(
        r#"[{"id": "Hemoglobin", "label": "Haemoglobin", "unit": "g/L",
             "min": 130, "max": 170, "synonyms": ["HGB"]}]"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(table, Default::default()).unwrap();

    let report = analyzer.analyze_text("HGB 118\nRBC 4.0", SampleMetadata::default());
    assert_eq!(report.values.len(), 1);
    assert_eq!(report.findings.all[0].unit, "g/L");
    assert!(report
        .findings
        .all
        .iter()
        .any(|finding| finding.subject == Subject::Rule(RuleId::AnemiaEvaluation)));
}
