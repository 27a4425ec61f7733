//! Per-parameter classification and composite hematology rules.

use cbc_core::{
    AnalysisConfig, ExtractedValues, Finding, FindingValue, ParameterDefinition, ParameterId,
    ReferenceTable, RuleId, Status, Subject,
};

const WITHIN_RANGE: &str = "Within normal range.";

const ANEMIA_WORKUP: &str = "Possible anemia. Evaluate with MCV classification (microcytic, normocytic, macrocytic). Refer to 'Diagnostic approach to anemia in adults' or 'Approach to the child with anemia'. Consider reticulocyte count for production vs. loss/destruction.";

const ERYTHROCYTOSIS_WORKUP: &str = "Erythrocytosis/polycythemia. Refer to 'Diagnostic approach to the patient with erythrocytosis/polycythemia'.";

/// Curated guidance for one (parameter, status) pair.
struct Guidance {
    id: ParameterId,
    status: Status,
    suggestion: &'static str,
    /// Reason contributed to the smear recommendation, if the result warrants one.
    smear_reason: Option<&'static str>,
}

const fn guidance(
    id: ParameterId,
    status: Status,
    suggestion: &'static str,
    smear_reason: Option<&'static str>,
) -> Guidance {
    Guidance {
        id,
        status,
        suggestion,
        smear_reason,
    }
}

#[rustfmt::skip]
const GUIDANCE: &[Guidance] = &[
    guidance(ParameterId::Rbc, Status::Low, ANEMIA_WORKUP, Some("Low RBC count")),
    guidance(ParameterId::Rbc, Status::High, ERYTHROCYTOSIS_WORKUP, Some("High RBC count")),
    guidance(ParameterId::Hemoglobin, Status::Low, ANEMIA_WORKUP, Some("Low hemoglobin")),
    guidance(ParameterId::Hemoglobin, Status::High, ERYTHROCYTOSIS_WORKUP, Some("High hemoglobin")),
    guidance(ParameterId::Hematocrit, Status::Low, ANEMIA_WORKUP, Some("Low hematocrit")),
    guidance(ParameterId::Hematocrit, Status::High, ERYTHROCYTOSIS_WORKUP, Some("High hematocrit")),
    guidance(
        ParameterId::Platelets,
        Status::Low,
        "Thrombocytopenia. Exclude pseudothrombocytopenia from in-vitro platelet clumping. Refer to 'Approach to the child with unexplained thrombocytopenia' or 'Diagnostic approach to thrombocytopenia in adults'.",
        Some("Low platelets: exclude pseudothrombocytopenia (platelet clumping)"),
    ),
    guidance(
        ParameterId::Platelets,
        Status::High,
        "Thrombocytosis. Refer to 'Approach to the patient with thrombocytosis'.",
        Some("High platelets: assess platelet morphology"),
    ),
    guidance(
        ParameterId::Wbc,
        Status::Low,
        "Neutropenia or lymphopenia possible. Refer to 'Evaluation of neutropenia in children and adolescents' or 'Approach to the adult with unexplained neutropenia'. If lymphocytes are low, consider primary immunodeficiency disorders (PID): check absolute lymphocyte count (ALC); low ALC suggests a T-cell disorder.",
        Some("Low WBC"),
    ),
    guidance(
        ParameterId::Wbc,
        Status::High,
        "Neutrophilia or leukocytosis. Refer to 'Approach to the patient with neutrophilia'. Check for infection, inflammation, or malignancy. Review peripheral smear for left shift.",
        Some("High WBC: check for left shift or blasts"),
    ),
    guidance(
        ParameterId::Neutrophils,
        Status::Low,
        "Neutropenia: increased infection risk. Evaluate for phagocytic disorders or PID. Series of CBCs needed for confirmation.",
        Some("Neutropenia"),
    ),
    guidance(
        ParameterId::Neutrophils,
        Status::High,
        "Neutrophilia. Evaluate CBC with differential and smear. Causes: infection, stress, malignancy. If persistent, consider bone marrow biopsy.",
        Some("Neutrophilia: look for toxic granulation"),
    ),
    guidance(
        ParameterId::Lymphocytes,
        Status::Low,
        "Lymphopenia: possible T-cell deficiency. In PID, low ALC on CBC prompts further immunoglobulin and complement testing.",
        None,
    ),
    guidance(
        ParameterId::Lymphocytes,
        Status::High,
        "Lymphocytosis. Review the peripheral smear for reactive or atypical lymphocytes; persistent elevation warrants flow cytometry.",
        None,
    ),
];

fn lookup_guidance(id: ParameterId, status: Status) -> Option<&'static Guidance> {
    GUIDANCE
        .iter()
        .find(|entry| entry.id == id && entry.status == status)
}

/// Red-cell morphology inferred from MCV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnemiaMorphology {
    Microcytic,
    Normocytic,
    Macrocytic,
}

impl AnemiaMorphology {
    pub fn classify(mcv: f64, config: &AnalysisConfig) -> Self {
        if mcv < config.microcytic_mcv_below {
            AnemiaMorphology::Microcytic
        } else if mcv > config.macrocytic_mcv_above {
            AnemiaMorphology::Macrocytic
        } else {
            AnemiaMorphology::Normocytic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnemiaMorphology::Microcytic => "Microcytic",
            AnemiaMorphology::Normocytic => "Normocytic",
            AnemiaMorphology::Macrocytic => "Macrocytic",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            AnemiaMorphology::Microcytic => "Microcytic: Possible iron deficiency or thalassemia.",
            AnemiaMorphology::Normocytic => "Normocytic: Possible chronic disease or hemolysis.",
            AnemiaMorphology::Macrocytic => "Macrocytic: Possible B12/folate deficiency.",
        }
    }
}

/// Classify every present value, then append composite-rule findings.
///
/// Output order: parameters in table order, then Rule of Threes, RDW,
/// anemia, lymphopenia and finally the smear recommendation.
pub fn evaluate(
    table: &ReferenceTable,
    config: &AnalysisConfig,
    values: &ExtractedValues,
) -> Vec<Finding> {
    let mut evaluation = Evaluation::new(table, config, values);
    evaluation.classify_parameters();
    evaluation.rule_of_threes();
    evaluation.rdw_interpretation();
    evaluation.anemia();
    evaluation.lymphopenia();
    evaluation.finish()
}

struct Evaluation<'a> {
    table: &'a ReferenceTable,
    config: &'a AnalysisConfig,
    values: &'a ExtractedValues,
    findings: Vec<Finding>,
    smear_reasons: Vec<&'static str>,
}

impl<'a> Evaluation<'a> {
    fn new(
        table: &'a ReferenceTable,
        config: &'a AnalysisConfig,
        values: &'a ExtractedValues,
    ) -> Self {
        Self {
            table,
            config,
            values,
            findings: Vec::new(),
            smear_reasons: Vec::new(),
        }
    }

    fn classify_parameters(&mut self) {
        for definition in self.table.iter() {
            let Some(value) = self.values.get(definition.id) else {
                continue;
            };
            let status = definition.range.classify(value);
            let curated = lookup_guidance(definition.id, status);

            let suggestion = match (status, curated) {
                (Status::Normal, _) => WITHIN_RANGE.to_string(),
                (_, Some(entry)) => entry.suggestion.to_string(),
                (_, None) => format!("{status} {}. Investigate further.", definition.id),
            };

            if let Some(reason) = curated.and_then(|entry| entry.smear_reason) {
                self.smear_reasons.push(reason);
            }

            self.findings.push(Finding {
                subject: Subject::Parameter(definition.id),
                label: definition.label.clone(),
                value: FindingValue::Numeric(value),
                unit: definition.unit.clone(),
                status,
                suggestion,
            });
        }
    }

    fn rule_of_threes(&mut self) {
        let (Some(rbc), Some(hb), Some(hct)) = (
            self.values.get(ParameterId::Rbc),
            self.values.get(ParameterId::Hemoglobin),
            self.values.get(ParameterId::Hematocrit),
        ) else {
            return;
        };

        let consistent = (3.0 * rbc - hb).abs() < self.config.rule_of_threes_hb_tolerance
            && (3.0 * hb - hct).abs() < self.config.rule_of_threes_hct_tolerance;
        if consistent {
            return;
        }

        self.push_rule(
            RuleId::RuleOfThrees,
            FindingValue::Label("Violated".to_string()),
            String::new(),
            Status::Abnormal,
            "Results may be spurious or indicate a true hematologic condition. Recommend blood smear evaluation.".to_string(),
        );
        self.smear_reasons.push("Rule of Threes violated");
    }

    fn rdw_interpretation(&mut self) {
        let Some((rdw, definition)) = self.reading(ParameterId::Rdw) else {
            return;
        };
        if rdw <= definition.range.max {
            return;
        }

        self.push_rule(
            RuleId::RdwInterpretation,
            FindingValue::Numeric(rdw),
            definition.unit.clone(),
            Status::Elevated,
            "Anisocytosis. A high RDW favors iron deficiency over thalassemia trait or anemia of chronic disease, which usually keep a normal RDW. Correlate with MCV and iron studies.".to_string(),
        );
        self.smear_reasons.push("Elevated RDW (anisocytosis)");
    }

    fn anemia(&mut self) {
        let Some((hb, definition)) = self.reading(ParameterId::Hemoglobin) else {
            return;
        };
        if hb >= definition.range.min {
            return;
        }

        let morphology = self
            .values
            .get(ParameterId::Mcv)
            .map(|mcv| AnemiaMorphology::classify(mcv, self.config));

        let mut sentences = vec!["Low Hb indicates anemia."];
        if let Some(morphology) = morphology {
            sentences.push(morphology.explanation());
        }
        sentences.push("Use reticulocyte count to assess production.");
        sentences.push("Peripheral smear for morphology.");

        let label = morphology.map_or("Unclassified", AnemiaMorphology::label);
        self.push_rule(
            RuleId::AnemiaEvaluation,
            FindingValue::Label(label.to_string()),
            String::new(),
            Status::Abnormal,
            sentences.join(" "),
        );
        self.smear_reasons.push("Anemia: assess red cell morphology");
    }

    fn lymphopenia(&mut self) {
        let Some((lymphocytes, definition)) = self.reading(ParameterId::Lymphocytes) else {
            return;
        };
        if lymphocytes >= definition.range.min {
            return;
        }

        self.push_rule(
            RuleId::Lymphopenia,
            FindingValue::Numeric(lymphocytes),
            definition.unit.clone(),
            Status::Abnormal,
            "Low lymphocytes: Consider primary immunodeficiency. Initial tests: CBC with ALC, immunoglobulins, complement. If low ALC, evaluate T-cell function.".to_string(),
        );
        self.smear_reasons.push("Lymphopenia: review lymphocyte morphology");
    }

    fn finish(mut self) -> Vec<Finding> {
        if !self.smear_reasons.is_empty() {
            let suggestion = self.smear_reasons.join("; ");
            self.push_rule(
                RuleId::SmearRecommendation,
                FindingValue::Label("Recommended".to_string()),
                String::new(),
                Status::ActionNeeded,
                suggestion,
            );
        }
        self.findings
    }

    /// Value plus its table entry; `None` when either is missing.
    fn reading(&self, id: ParameterId) -> Option<(f64, &'a ParameterDefinition)> {
        Some((self.values.get(id)?, self.table.get(id)?))
    }

    fn push_rule(
        &mut self,
        rule: RuleId,
        value: FindingValue,
        unit: String,
        status: Status,
        suggestion: String,
    ) {
        self.findings.push(Finding {
            subject: Subject::Rule(rule),
            label: rule.label().to_string(),
            value,
            unit,
            status,
            suggestion,
        });
    }
}
