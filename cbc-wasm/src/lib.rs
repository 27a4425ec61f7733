//! Framework-neutral WASM <-> JavaScript bridge for report analysis.

use std::collections::BTreeMap;

use cbc_analysis::Analyzer;
use cbc_core::advice::{COLLECTION_ADVICE, STORAGE_ADVICE};
use cbc_core::{
    AnalysisConfig, AnalysisError, ExtractedValues, ReferenceTable, SampleMetadata,
    StorageCondition,
};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
struct JsAnalysisConfig {
    #[serde(default)]
    stale_sample_hours: Option<f64>,
    #[serde(default)]
    rule_of_threes_hb_tolerance: Option<f64>,
    #[serde(default)]
    rule_of_threes_hct_tolerance: Option<f64>,
    #[serde(default)]
    microcytic_mcv_below: Option<f64>,
    #[serde(default)]
    macrocytic_mcv_above: Option<f64>,
}

impl From<JsAnalysisConfig> for AnalysisConfig {
    fn from(cfg: JsAnalysisConfig) -> Self {
        let mut base = AnalysisConfig::default();
        if let Some(hours) = cfg.stale_sample_hours {
            base.stale_sample_hours = hours;
        }
        if let Some(tolerance) = cfg.rule_of_threes_hb_tolerance {
            base.rule_of_threes_hb_tolerance = tolerance;
        }
        if let Some(tolerance) = cfg.rule_of_threes_hct_tolerance {
            base.rule_of_threes_hct_tolerance = tolerance;
        }
        if let Some(mcv) = cfg.microcytic_mcv_below {
            base.microcytic_mcv_below = mcv;
        }
        if let Some(mcv) = cfg.macrocytic_mcv_above {
            base.macrocytic_mcv_above = mcv;
        }
        base
    }
}

/// Form payload: `{ age_hours?: number, storage?: "frozen" | "Room Temperature" | ... }`.
#[derive(Debug, Default, Deserialize)]
struct JsSampleMetadata {
    #[serde(default)]
    age_hours: Option<f64>,
    #[serde(default)]
    storage: Option<String>,
}

impl TryFrom<JsSampleMetadata> for SampleMetadata {
    type Error = AnalysisError;

    fn try_from(meta: JsSampleMetadata) -> Result<Self, Self::Error> {
        let storage = match meta.storage.as_deref() {
            Some(text) => text.parse::<StorageCondition>()?,
            None => Default::default(),
        };
        SampleMetadata::new(meta.age_hours.unwrap_or(0.0), storage)
    }
}

#[derive(Serialize)]
struct Advice {
    collection: &'static [&'static str],
    storage: &'static [&'static str],
}

/// Analyze text produced by an OCR/PDF collaborator.
#[wasm_bindgen]
pub fn analyze_report(
    text: &str,
    metadata: Option<JsValue>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let analyzer = build_analyzer(config)?;
    let metadata = read_metadata(metadata)?;
    to_js(&analyzer.analyze_text(text, metadata))
}

/// Analyze values typed into a form, keyed by parameter code or label.
#[wasm_bindgen]
pub fn analyze_manual(
    values: JsValue,
    metadata: Option<JsValue>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let analyzer = build_analyzer(config)?;
    let metadata = read_metadata(metadata)?;
    let entries = from_value::<BTreeMap<String, f64>>(values)
        .map_err(|err| JsValue::from_str(&format!("Could not read manual values: {err}")))?;
    let values =
        ExtractedValues::from_manual(analyzer.table(), entries).map_err(format_analysis_error)?;

    to_js(&analyzer.analyze_values(values, metadata))
}

/// Reference ranges, units and labels for building input forms.
#[wasm_bindgen]
pub fn reference_table() -> Result<JsValue, JsValue> {
    to_js(&ReferenceTable::standard())
}

#[wasm_bindgen]
pub fn collection_advice() -> Result<JsValue, JsValue> {
    to_js(&Advice {
        collection: COLLECTION_ADVICE,
        storage: STORAGE_ADVICE,
    })
}

fn build_analyzer(config: Option<JsValue>) -> Result<Analyzer, JsValue> {
    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsAnalysisConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            AnalysisConfig::from(cfg)
        }
        None => AnalysisConfig::default(),
    };
    Analyzer::new(ReferenceTable::standard(), cfg).map_err(format_analysis_error)
}

fn read_metadata(metadata: Option<JsValue>) -> Result<SampleMetadata, JsValue> {
    let meta = match metadata {
        Some(js_meta) => from_value::<JsSampleMetadata>(js_meta)
            .map_err(|err| JsValue::from_str(&format!("Could not read sample metadata: {err}")))?,
        None => JsSampleMetadata::default(),
    };
    SampleMetadata::try_from(meta).map_err(format_analysis_error)
}

/// Plain objects instead of `Map`s so the result reads like JSON on the JS side.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Could not serialize result: {err}")))
}

fn format_analysis_error(err: AnalysisError) -> JsValue {
    JsValue::from_str(&format!("Analysis error: {err}"))
}
