//! Core data model for complete blood count (CBC) analysis.
//!
//! This crate holds the types shared by the extractor, the rule engine and the
//! presentation bridges. It performs no I/O and carries no pattern engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod advice;
mod reference;

pub use reference::{ParameterDefinition, ReferenceRange, ReferenceTable};

/// Thresholds used by the quality and composite-rule passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples older than this many hours are flagged as stale.
    pub stale_sample_hours: f64,
    /// Largest tolerated `|3·RBC − Hb|` before the Rule of Threes is violated.
    pub rule_of_threes_hb_tolerance: f64,
    /// Largest tolerated `|3·Hb − HCT|` before the Rule of Threes is violated.
    pub rule_of_threes_hct_tolerance: f64,
    pub microcytic_mcv_below: f64,
    pub macrocytic_mcv_above: f64,
}

impl AnalysisConfig {
    /// Reject thresholds the rules cannot work with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fields = [
            ("stale_sample_hours", self.stale_sample_hours),
            ("rule_of_threes_hb_tolerance", self.rule_of_threes_hb_tolerance),
            ("rule_of_threes_hct_tolerance", self.rule_of_threes_hct_tolerance),
            ("microcytic_mcv_below", self.microcytic_mcv_below),
            ("macrocytic_mcv_above", self.macrocytic_mcv_above),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number, got {value}"
                )));
            }
        }
        if self.rule_of_threes_hb_tolerance == 0.0 || self.rule_of_threes_hct_tolerance == 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "Rule of Threes tolerances must be greater than zero".to_string(),
            ));
        }
        if self.microcytic_mcv_below > self.macrocytic_mcv_above {
            return Err(AnalysisError::InvalidConfig(format!(
                "microcytic_mcv_below {} exceeds macrocytic_mcv_above {}",
                self.microcytic_mcv_below, self.macrocytic_mcv_above
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stale_sample_hours: 72.0,
            rule_of_threes_hb_tolerance: 1.0,
            rule_of_threes_hct_tolerance: 3.0,
            microcytic_mcv_below: 80.0,
            macrocytic_mcv_above: 100.0,
        }
    }
}

/// Hematology parameters known to the analyzer, in reporting order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterId {
    #[serde(rename = "RBC")]
    Rbc,
    Hemoglobin,
    Hematocrit,
    #[serde(rename = "MCV")]
    Mcv,
    #[serde(rename = "MCH")]
    Mch,
    #[serde(rename = "MCHC")]
    Mchc,
    #[serde(rename = "RDW")]
    Rdw,
    #[serde(rename = "WBC")]
    Wbc,
    Neutrophils,
    Lymphocytes,
    Monocytes,
    Eosinophils,
    Basophils,
    Platelets,
    #[serde(rename = "MPV")]
    Mpv,
    Reticulocytes,
}

impl ParameterId {
    pub const ALL: [ParameterId; 16] = [
        ParameterId::Rbc,
        ParameterId::Hemoglobin,
        ParameterId::Hematocrit,
        ParameterId::Mcv,
        ParameterId::Mch,
        ParameterId::Mchc,
        ParameterId::Rdw,
        ParameterId::Wbc,
        ParameterId::Neutrophils,
        ParameterId::Lymphocytes,
        ParameterId::Monocytes,
        ParameterId::Eosinophils,
        ParameterId::Basophils,
        ParameterId::Platelets,
        ParameterId::Mpv,
        ParameterId::Reticulocytes,
    ];

    /// Short code used in reports and serialized payloads.
    pub fn code(self) -> &'static str {
        match self {
            ParameterId::Rbc => "RBC",
            ParameterId::Hemoglobin => "Hemoglobin",
            ParameterId::Hematocrit => "Hematocrit",
            ParameterId::Mcv => "MCV",
            ParameterId::Mch => "MCH",
            ParameterId::Mchc => "MCHC",
            ParameterId::Rdw => "RDW",
            ParameterId::Wbc => "WBC",
            ParameterId::Neutrophils => "Neutrophils",
            ParameterId::Lymphocytes => "Lymphocytes",
            ParameterId::Monocytes => "Monocytes",
            ParameterId::Eosinophils => "Eosinophils",
            ParameterId::Basophils => "Basophils",
            ParameterId::Platelets => "Platelets",
            ParameterId::Mpv => "MPV",
            ParameterId::Reticulocytes => "Reticulocytes",
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ParameterId {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ParameterId::ALL
            .into_iter()
            .find(|id| id.code().eq_ignore_ascii_case(needle))
            .ok_or_else(|| AnalysisError::UnknownParameter(needle.to_string()))
    }
}

/// Parameter readings for one report. A missing key means "not found".
///
/// Values are always finite and non-negative; every constructor enforces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(
    try_from = "BTreeMap<ParameterId, f64>",
    into = "BTreeMap<ParameterId, f64>"
)]
pub struct ExtractedValues(BTreeMap<ParameterId, f64>);

impl ExtractedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-typed pairs; later duplicates overwrite earlier ones.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (ParameterId, f64)>,
    {
        let mut values = Self::new();
        for (id, value) in pairs {
            values.insert(id, value)?;
        }
        Ok(values)
    }

    /// Build from form input keyed by parameter code or display label.
    pub fn from_manual<I, K>(table: &ReferenceTable, entries: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut values = Self::new();
        for (name, value) in entries {
            let name = name.as_ref();
            let id = table
                .resolve(name)
                .ok_or_else(|| AnalysisError::UnknownParameter(name.trim().to_string()))?;
            values.insert(id, value)?;
        }
        Ok(values)
    }

    pub fn insert(&mut self, id: ParameterId, value: f64) -> Result<(), AnalysisError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AnalysisError::InvalidValue {
                parameter: id,
                value,
            });
        }
        self.0.insert(id, value);
        Ok(())
    }

    pub fn get(&self, id: ParameterId) -> Option<f64> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: ParameterId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, f64)> + '_ {
        self.0.iter().map(|(id, value)| (*id, *value))
    }
}

impl TryFrom<BTreeMap<ParameterId, f64>> for ExtractedValues {
    type Error = AnalysisError;

    fn try_from(map: BTreeMap<ParameterId, f64>) -> Result<Self, Self::Error> {
        Self::from_pairs(map)
    }
}

impl From<ExtractedValues> for BTreeMap<ParameterId, f64> {
    fn from(values: ExtractedValues) -> Self {
        values.0
    }
}

/// How the sample was kept between collection and analysis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StorageCondition {
    #[default]
    RoomTemperature,
    Refrigerated,
    Frozen,
    Heated,
}

impl StorageCondition {
    pub const ALL: [StorageCondition; 4] = [
        StorageCondition::RoomTemperature,
        StorageCondition::Refrigerated,
        StorageCondition::Frozen,
        StorageCondition::Heated,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StorageCondition::RoomTemperature => "Room Temperature",
            StorageCondition::Refrigerated => "Refrigerated",
            StorageCondition::Frozen => "Frozen",
            StorageCondition::Heated => "Heated",
        }
    }
}

impl fmt::Display for StorageCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StorageCondition {
    type Err = AnalysisError;

    /// Accepts `room_temperature`, `room-temperature`, `Room Temperature`...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squash = |text: &str| {
            text.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        };
        let needle = squash(s);
        StorageCondition::ALL
            .into_iter()
            .find(|condition| squash(condition.label()) == needle)
            .ok_or_else(|| {
                AnalysisError::InvalidMetadata(format!("unknown storage condition `{}`", s.trim()))
            })
    }
}

/// Collection metadata supplied alongside each report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawSampleMetadata")]
pub struct SampleMetadata {
    pub age_hours: f64,
    pub storage: StorageCondition,
}

#[derive(Deserialize)]
struct RawSampleMetadata {
    age_hours: f64,
    storage: StorageCondition,
}

impl TryFrom<RawSampleMetadata> for SampleMetadata {
    type Error = AnalysisError;

    fn try_from(raw: RawSampleMetadata) -> Result<Self, Self::Error> {
        Self::new(raw.age_hours, raw.storage)
    }
}

impl SampleMetadata {
    pub fn new(age_hours: f64, storage: StorageCondition) -> Result<Self, AnalysisError> {
        if !age_hours.is_finite() || age_hours < 0.0 {
            return Err(AnalysisError::InvalidMetadata(format!(
                "sample age must be a non-negative number of hours, got {age_hours}"
            )));
        }
        Ok(Self { age_hours, storage })
    }

    /// Derive the sample age from its collection instant.
    pub fn from_collection_time(
        collected_at: DateTime<Utc>,
        now: DateTime<Utc>,
        storage: StorageCondition,
    ) -> Result<Self, AnalysisError> {
        let elapsed = now.signed_duration_since(collected_at);
        if elapsed < chrono::Duration::zero() {
            return Err(AnalysisError::InvalidMetadata(format!(
                "collection time {collected_at} is later than {now}"
            )));
        }
        Self::new(elapsed.num_seconds() as f64 / 3600.0, storage)
    }
}

/// Outcome attached to a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Normal,
    Low,
    High,
    Abnormal,
    Elevated,
    ActionNeeded,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Normal => "Normal",
            Status::Low => "Low",
            Status::High => "High",
            Status::Abnormal => "Abnormal",
            Status::Elevated => "Elevated",
            Status::ActionNeeded => "Action needed",
        }
    }

    pub fn is_normal(self) -> bool {
        self == Status::Normal
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Composite rules evaluated after the per-parameter pass, in evaluation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    RuleOfThrees,
    RdwInterpretation,
    AnemiaEvaluation,
    Lymphopenia,
    SmearRecommendation,
}

impl RuleId {
    pub fn label(self) -> &'static str {
        match self {
            RuleId::RuleOfThrees => "Rule of Threes",
            RuleId::RdwInterpretation => "RDW Interpretation",
            RuleId::AnemiaEvaluation => "Anemia Evaluation",
            RuleId::Lymphopenia => "Possible PID",
            RuleId::SmearRecommendation => "Peripheral Blood Smear",
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Parameter(ParameterId),
    Rule(RuleId),
}

/// Measured number or categorical label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FindingValue {
    Numeric(f64),
    Label(String),
}

impl fmt::Display for FindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingValue::Numeric(value) => f.write_str(&format_numeric(*value)),
            FindingValue::Label(label) => f.write_str(label),
        }
    }
}

/// One row of the analysis table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub subject: Subject,
    pub label: String,
    pub value: FindingValue,
    pub unit: String,
    pub status: Status,
    pub suggestion: String,
}

impl Finding {
    pub fn is_abnormal(&self) -> bool {
        !self.status.is_normal()
    }
}

/// Condition that raised a sample-quality warning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssueKind {
    StaleSample,
    Frozen,
    Heated,
    ElevatedMcv,
    ElevatedMpv,
    PossibleHemolysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityIssue {
    pub kind: QualityIssueKind,
    pub message: String,
}

/// Findings split for display: everything, and the non-normal subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FindingSummary {
    pub all: Vec<Finding>,
    pub abnormal: Vec<Finding>,
}

/// Everything the presentation layer needs for one submitted report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub metadata: SampleMetadata,
    pub values: ExtractedValues,
    pub quality_issues: Vec<QualityIssue>,
    pub findings: FindingSummary,
    pub follow_up: Option<String>,
}

impl AnalysisReport {
    pub fn new(
        metadata: SampleMetadata,
        values: ExtractedValues,
        quality_issues: Vec<QualityIssue>,
        findings: FindingSummary,
        follow_up: Option<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            metadata,
            values,
            quality_issues,
            findings,
            follow_up,
        }
    }

    pub fn has_abnormal(&self) -> bool {
        !self.findings.abnormal.is_empty()
    }
}

/// Errors raised at input boundaries (configuration, manual entry, metadata).
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid reference table: {0}")]
    InvalidTable(String),
    #[error("invalid synonym pattern for {parameter}: {message}")]
    InvalidPattern {
        parameter: ParameterId,
        message: String,
    },
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("invalid value {value} for {parameter}: expected a finite, non-negative number")]
    InvalidValue { parameter: ParameterId, value: f64 },
    #[error("invalid sample metadata: {0}")]
    InvalidMetadata(String),
    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),
    #[error("could not parse input: {0}")]
    Parse(String),
}

fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
