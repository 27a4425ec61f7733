//! Pre-analytical guidance displayed next to every analysis.

pub const COLLECTION_ADVICE: &[&str] = &[
    "Perform phlebotomy by a trained phlebotomist.",
    "Use EDTA (purple top) or sodium citrate (blue top) tubes.",
    "Avoid underfilling or overfilling tubes to prevent inaccurate results.",
    "Avoid hemolysis: use an appropriate needle gauge and avoid tight tourniquets.",
    "Do not collect proximal to an IV line to prevent dilution.",
];

pub const STORAGE_ADVICE: &[&str] = &[
    "Keep at room temperature for analysis within 24 hours.",
    "Refrigerate for analysis up to 72 hours.",
    "Avoid freezing or heat exposure.",
    "Samples older than 72 hours may show spurious results (e.g. elevated MCV, MPV).",
    "Prepare blood films within 8 hours.",
];

/// Closing note attached to reports that contain at least one abnormal finding.
pub const ABNORMAL_FOLLOW_UP: &str = "Consider peripheral blood smear, further tests, or consult a specialist. For PID: if lymphocytes are low, test immunoglobulins and complement.";
