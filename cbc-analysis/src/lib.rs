//! CBC text extraction, sample-quality checks and rule evaluation.
//!
//! ```text
//! OCR text ──► Extractor ──► ExtractedValues ◄── manual values
//!                                  │
//!                ┌─────────────────┴─────────────────┐
//!          assess_quality                  evaluate ──► assemble
//!                └─────────────────┬─────────────────┘
//!                            AnalysisReport
//! ```

use std::collections::BTreeMap;

use cbc_core::{
    AnalysisConfig, AnalysisError, AnalysisReport, ExtractedValues, Finding, QualityIssue,
    ReferenceTable, SampleMetadata,
};

pub mod extract;
pub mod quality;
pub mod report;
pub mod rules;

pub use extract::Extractor;
pub use quality::assess_quality;
pub use report::assemble;
pub use rules::{evaluate, AnemiaMorphology};

/// Reference table, compiled extractor and thresholds, built once and reused
/// for every report.
#[derive(Debug, Clone)]
pub struct Analyzer {
    table: ReferenceTable,
    extractor: Extractor,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(table: ReferenceTable, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let extractor = Extractor::new(&table)?;
        Ok(Self {
            table,
            extractor,
            config,
        })
    }

    /// Built-in adult ranges with default thresholds.
    pub fn with_defaults() -> Result<Self, AnalysisError> {
        Self::new(ReferenceTable::standard(), AnalysisConfig::default())
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn extract(&self, text: &str) -> ExtractedValues {
        self.extractor.extract(text)
    }

    pub fn assess_quality(
        &self,
        values: &ExtractedValues,
        metadata: &SampleMetadata,
    ) -> Vec<QualityIssue> {
        quality::assess_quality(&self.table, &self.config, values, metadata)
    }

    pub fn evaluate(&self, values: &ExtractedValues) -> Vec<Finding> {
        rules::evaluate(&self.table, &self.config, values)
    }

    /// Run quality checks and rules over values that are already structured.
    pub fn analyze_values(&self, values: ExtractedValues, metadata: SampleMetadata) -> AnalysisReport {
        let quality_issues = self.assess_quality(&values, &metadata);
        let summary = report::assemble(self.evaluate(&values));
        let follow_up = report::follow_up(&summary);

        tracing::debug!(
            values = values.len(),
            findings = summary.all.len(),
            abnormal = summary.abnormal.len(),
            quality_issues = quality_issues.len(),
            "analysis complete"
        );

        AnalysisReport::new(metadata, values, quality_issues, summary, follow_up)
    }

    /// Extract values from OCR/PDF text, then analyze them.
    pub fn analyze_text(&self, text: &str, metadata: SampleMetadata) -> AnalysisReport {
        let values = self.extract(text);
        if values.is_empty() {
            tracing::debug!(chars = text.len(), "no CBC values recognised in text");
        }
        self.analyze_values(values, metadata)
    }

    /// Parse a manual-entry JSON object such as `{"RBC": 5.1, "Platelet Count": 250}`.
    pub fn parse_manual_json(&self, json: &str) -> Result<ExtractedValues, AnalysisError> {
        parse_manual_json(&self.table, json)
    }
}

/// Parse a JSON object of field name → number into validated values.
pub fn parse_manual_json(
    table: &ReferenceTable,
    json: &str,
) -> Result<ExtractedValues, AnalysisError> {
    let entries: BTreeMap<String, f64> =
        serde_json::from_str(json).map_err(|err| AnalysisError::Parse(err.to_string()))?;
    ExtractedValues::from_manual(table, entries)
}

/// Parse a (possibly partial) JSON thresholds object; missing fields keep defaults.
pub fn parse_config_json(json: &str) -> Result<AnalysisConfig, AnalysisError> {
    let config: AnalysisConfig =
        serde_json::from_str(json).map_err(|err| AnalysisError::Parse(err.to_string()))?;
    config.validate()?;
    Ok(config)
}
