//! Pre-analytical sample quality heuristics.

use cbc_core::{
    AnalysisConfig, ExtractedValues, ParameterId, QualityIssue, QualityIssueKind, ReferenceTable,
    SampleMetadata, StorageCondition,
};

/// Every predicate is checked independently, in a fixed order.
pub fn assess_quality(
    table: &ReferenceTable,
    config: &AnalysisConfig,
    values: &ExtractedValues,
    metadata: &SampleMetadata,
) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    if metadata.age_hours > config.stale_sample_hours {
        issues.push(issue(
            QualityIssueKind::StaleSample,
            format!(
                "Sample is older than {} hours: may show spurious elevated MCV and MPV due to cell swelling.",
                config.stale_sample_hours
            ),
        ));
    }

    match metadata.storage {
        StorageCondition::Frozen => issues.push(issue(
            QualityIssueKind::Frozen,
            "Freezing causes cell lysis, leading to inaccurate counts.",
        )),
        StorageCondition::Heated => issues.push(issue(
            QualityIssueKind::Heated,
            "Heat exposure causes RBC fragmentation, mimicking samples from thermal injury, and can distort platelet counts.",
        )),
        StorageCondition::RoomTemperature | StorageCondition::Refrigerated => {}
    }

    if above_range(table, values, ParameterId::Mcv) {
        issues.push(issue(
            QualityIssueKind::ElevatedMcv,
            "Elevated MCV may indicate an aged sample or true macrocytosis.",
        ));
    }

    if above_range(table, values, ParameterId::Mpv) {
        issues.push(issue(
            QualityIssueKind::ElevatedMpv,
            "Elevated MPV suggests prolonged EDTA exposure.",
        ));
    }

    if below_range(table, values, ParameterId::Hemoglobin)
        && below_range(table, values, ParameterId::Rbc)
    {
        issues.push(issue(
            QualityIssueKind::PossibleHemolysis,
            "Possible hemolysis: low Hb and RBC may result from shearing during collection.",
        ));
    }

    issues
}

fn issue(kind: QualityIssueKind, message: impl Into<String>) -> QualityIssue {
    QualityIssue {
        kind,
        message: message.into(),
    }
}

fn above_range(table: &ReferenceTable, values: &ExtractedValues, id: ParameterId) -> bool {
    match (values.get(id), table.range_of(id)) {
        (Some(value), Some(range)) => value > range.max,
        _ => false,
    }
}

fn below_range(table: &ReferenceTable, values: &ExtractedValues, id: ParameterId) -> bool {
    match (values.get(id), table.range_of(id)) {
        (Some(value), Some(range)) => value < range.min,
        _ => false,
    }
}
