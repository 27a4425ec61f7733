//! Reference ranges, units, labels and synonym patterns per parameter.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, ParameterId, Status};

/// Inclusive adult reference interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, AnalysisError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(AnalysisError::InvalidTable(format!(
                "bounds must be finite, got [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(AnalysisError::InvalidTable(format!(
                "minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// `Low` below `min`, `High` above `max`, `Normal` on or between the bounds.
    pub fn classify(&self, value: f64) -> Status {
        if value < self.min {
            Status::Low
        } else if value > self.max {
            Status::High
        } else {
            Status::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDefinition {
    pub id: ParameterId,
    pub label: String,
    pub unit: String,
    #[serde(flatten)]
    pub range: ReferenceRange,
    /// Regex fragments tried in order; matched case-insensitively on word
    /// boundaries by the extractor.
    pub synonyms: Vec<String>,
}

/// Immutable lookup table, built once and shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    definitions: Vec<ParameterDefinition>,
}

impl ReferenceTable {
    pub fn new(definitions: Vec<ParameterDefinition>) -> Result<Self, AnalysisError> {
        if definitions.is_empty() {
            return Err(AnalysisError::InvalidTable(
                "at least one parameter must be defined".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for definition in &definitions {
            if !seen.insert(definition.id) {
                return Err(AnalysisError::InvalidTable(format!(
                    "{} is defined more than once",
                    definition.id
                )));
            }
            ReferenceRange::new(definition.range.min, definition.range.max).map_err(|err| {
                AnalysisError::InvalidTable(format!("{}: {err}", definition.id))
            })?;
            if definition.synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(AnalysisError::InvalidTable(format!(
                    "{} has no synonym patterns",
                    definition.id
                )));
            }
        }

        Ok(Self { definitions })
    }

    /// Load definitions from a JSON array, e.g. a lab-specific override file.
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let definitions: Vec<ParameterDefinition> =
            serde_json::from_str(json).map_err(|err| AnalysisError::Parse(err.to_string()))?;
        Self::new(definitions)
    }

    /// Adult CBC ranges.
    pub fn standard() -> Self {
        use ParameterId::*;

        #[rustfmt::skip]
        let definitions = vec![
            def(Rbc, "Red Blood Cell Count", "x10^12/L", 4.5, 5.9, &["RBC", "Red Blood Cell Count", "Red Blood Cells?", "Erythrocytes"]),
            def(Hemoglobin, "Hemoglobin (Hb)", "g/dL", 13.5, 17.5, &["Hemoglobin", "Haemoglobin", "HGB", "Hb"]),
            def(Hematocrit, "Hematocrit (HCT)", "%", 41.0, 53.0, &["Hematocrit", "Haematocrit", "HCT", "PCV"]),
            def(Mcv, "Mean Corpuscular Volume", "fL", 80.0, 100.0, &["MCV", "Mean Corpuscular Volume", "Mean Cell Volume"]),
            def(Mch, "Mean Corpuscular Hemoglobin", "pg", 27.0, 31.0, &["MCH", "Mean Corpuscular Hemoglobin", "Mean Cell Hemoglobin"]),
            def(Mchc, "Mean Corpuscular Hemoglobin Concentration", "g/dL", 32.0, 36.0, &["MCHC", "Mean Corpuscular Hemoglobin Concentration", "Mean Cell Hemoglobin Concentration"]),
            def(Rdw, "Red Cell Distribution Width", "%", 11.5, 14.5, &["RDW-CV", "RDW", "Red Cell Distribution Width"]),
            def(Wbc, "White Blood Cell Count", "x10^9/L", 4.5, 11.0, &["WBC", "White Blood Cell Count", "White Blood Cells?", "Leukocytes", "TLC"]),
            def(Neutrophils, "Neutrophils (Absolute)", "x10^9/L", 1.8, 7.7, &["Neutrophils", "Neut", "NEU", "ANC"]),
            def(Lymphocytes, "Lymphocytes (Absolute)", "x10^9/L", 1.0, 4.8, &["Lymphocytes", "Lymphs", "LYM", "ALC"]),
            def(Monocytes, "Monocytes (Absolute)", "x10^9/L", 0.2, 1.0, &["Monocytes", "Monos", "MONO"]),
            def(Eosinophils, "Eosinophils (Absolute)", "x10^9/L", 0.0, 0.5, &["Eosinophils", "Eos"]),
            def(Basophils, "Basophils (Absolute)", "x10^9/L", 0.0, 0.2, &["Basophils", "Basos", "BASO"]),
            def(Platelets, "Platelet Count", "x10^9/L", 150.0, 450.0, &["Platelets", "Platelet Count", "PLT", "Thrombocytes"]),
            def(Mpv, "Mean Platelet Volume", "fL", 7.4, 10.4, &["MPV", "Mean Platelet Volume"]),
            def(Reticulocytes, "Reticulocyte Count", "%", 0.5, 1.5, &["Reticulocytes", "Reticulocyte Count", "Retic", "RET"]),
        ];

        Self { definitions }
    }

    pub fn get(&self, id: ParameterId) -> Option<&ParameterDefinition> {
        self.definitions.iter().find(|definition| definition.id == id)
    }

    pub fn range_of(&self, id: ParameterId) -> Option<ReferenceRange> {
        self.get(id).map(|definition| definition.range)
    }

    /// Definitions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.definitions.iter()
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Match a form field name against parameter codes and display labels.
    pub fn resolve(&self, name: &str) -> Option<ParameterId> {
        let needle = name.trim();
        self.definitions
            .iter()
            .find(|definition| {
                definition.id.code().eq_ignore_ascii_case(needle)
                    || definition.label.eq_ignore_ascii_case(needle)
            })
            .map(|definition| definition.id)
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn def(
    id: ParameterId,
    label: &str,
    unit: &str,
    min: f64,
    max: f64,
    synonyms: &[&str],
) -> ParameterDefinition {
    ParameterDefinition {
        id,
        label: label.to_string(),
        unit: unit.to_string(),
        range: ReferenceRange { min, max },
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}
