//! Pulls parameter readings out of OCR or PDF text.

use std::sync::LazyLock;

use cbc_core::{AnalysisError, ExtractedValues, ParameterId, ReferenceTable};
use regex::Regex;

/// `x10^9`, `×10^12`, `x10⁹`, `x10**9`, and bare `10^9` or `10⁹` unit prefixes.
///
/// A bare `10` needs an exponent marker so that a reading of 10 survives.
static SCIENTIFIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[x×]\s?10(?:\^|\*\*)?[-−⁻]?[0-9⁰¹²³⁴⁵⁶⁷⁸⁹]{0,2}|\b10(?:(?:\^|\*\*)[-−]?[0-9]{1,2}|⁻?[⁰¹²³⁴⁵⁶⁷⁸⁹]{1,2})",
    )
    .expect("scientific prefix pattern is valid")
});

/// Synonym patterns compiled once per reference table.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: Vec<(ParameterId, Vec<Regex>)>,
}

impl Extractor {
    pub fn new(table: &ReferenceTable) -> Result<Self, AnalysisError> {
        let mut patterns = Vec::with_capacity(table.len());
        for definition in table.iter() {
            let mut compiled = Vec::with_capacity(definition.synonyms.len());
            for synonym in definition.synonyms.iter().filter(|s| !s.trim().is_empty()) {
                let regex = Regex::new(&value_pattern(synonym.trim())).map_err(|err| {
                    AnalysisError::InvalidPattern {
                        parameter: definition.id,
                        message: err.to_string(),
                    }
                })?;
                compiled.push(regex);
            }
            patterns.push((definition.id, compiled));
        }
        Ok(Self { patterns })
    }

    /// Map each parameter to the first value found after one of its synonyms.
    ///
    /// Synonyms are tried in table order and the first one that matches decides
    /// the outcome; a token that does not parse drops the parameter.
    pub fn extract(&self, text: &str) -> ExtractedValues {
        let normalized = normalize(text);
        let mut values = ExtractedValues::new();

        for (id, regexes) in &self.patterns {
            let Some(token) = regexes
                .iter()
                .find_map(|regex| regex.captures(&normalized))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
            else {
                continue;
            };

            match parse_token(token) {
                Some(value) => match values.insert(*id, value) {
                    Ok(()) => tracing::debug!(parameter = %id, value, "extracted value"),
                    Err(err) => tracing::debug!(parameter = %id, %err, "discarding value"),
                },
                None => tracing::debug!(parameter = %id, token, "discarding unparsable token"),
            }
        }

        values
    }
}

/// Undo locale and typesetting artifacts before matching: decimal commas
/// become periods, scientific-notation prefixes and stray carets disappear.
pub fn normalize(text: &str) -> String {
    let without_prefix = SCIENTIFIC_PREFIX.replace_all(text, "");
    without_prefix.replace(',', ".").replace('^', "")
}

fn value_pattern(synonym: &str) -> String {
    // Separator, then an optional unit written before the reading: either
    // parenthesised, "(g/dL)", or bare, "g/dL", "/L" (what remains of
    // "x10^9/L"), "fL", "pg", "%".
    format!(
        r"(?i)\b(?:{synonym})\b[\s:=]*(?:\([^)]*\)[\s:=]*)?(?:(?:[a-zµμ]*/[a-zµμ]+|fl|pg|%)[\s:=]+)?([0-9.]*[0-9])"
    )
}

fn parse_token(token: &str) -> Option<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}
