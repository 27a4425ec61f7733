use std::path::{Path, PathBuf};

use anyhow::Context;
use cbc_analysis::{parse_config_json, Analyzer};
use cbc_core::advice::{COLLECTION_ADVICE, STORAGE_ADVICE};
use cbc_core::{AnalysisConfig, AnalysisReport, ReferenceTable, SampleMetadata, StorageCondition};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "cbc_cli=info,cbc_analysis=info";

#[derive(Parser, Debug)]
#[command(
    name = "cbc-cli",
    about = "Analyze complete blood count reports from OCR text or manually entered values."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract values from report text (OCR/PDF output) and analyze them.
    Analyze {
        /// Path to the text file.
        #[arg(short, long)]
        input: PathBuf,
        #[command(flatten)]
        options: AnalysisOptions,
    },
    /// Analyze a JSON object of values, e.g. {"RBC": 4.9, "Platelet Count": 250}.
    Manual {
        /// Path to the JSON file.
        #[arg(short, long)]
        values: PathBuf,
        #[command(flatten)]
        options: AnalysisOptions,
    },
    /// Print sample collection and storage advice.
    Advice,
}

#[derive(Args, Debug)]
struct AnalysisOptions {
    /// Hours since collection.
    #[arg(long, default_value_t = 0.0, conflicts_with = "collected_at")]
    age_hours: f64,
    /// Collection time (RFC 3339); the sample age is measured up to now.
    #[arg(long)]
    collected_at: Option<DateTime<Utc>>,
    /// room-temperature, refrigerated, frozen or heated.
    #[arg(long, default_value = "room-temperature")]
    storage: StorageCondition,
    /// JSON file replacing the built-in reference table.
    #[arg(long)]
    ranges: Option<PathBuf>,
    /// JSON file overriding analysis thresholds.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

impl AnalysisOptions {
    fn metadata(&self) -> anyhow::Result<SampleMetadata> {
        let metadata = match self.collected_at {
            Some(collected_at) => {
                SampleMetadata::from_collection_time(collected_at, Utc::now(), self.storage)?
            }
            None => SampleMetadata::new(self.age_hours, self.storage)?,
        };
        Ok(metadata)
    }

    fn analyzer(&self) -> anyhow::Result<Analyzer> {
        let table = match &self.ranges {
            Some(path) => ReferenceTable::from_json_str(&read_file(path)?)
                .with_context(|| format!("Invalid reference table in {}", path.display()))?,
            None => ReferenceTable::standard(),
        };
        let config = match &self.config {
            Some(path) => parse_config_json(&read_file(path)?)
                .with_context(|| format!("Invalid analysis config in {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        Ok(Analyzer::new(table, config)?)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { input, options } => {
            let text = read_file(&input)?;
            let report = options.analyzer()?.analyze_text(&text, options.metadata()?);
            if report.values.is_empty() {
                tracing::warn!(
                    "No CBC values found in {}. Try manual input.",
                    input.display()
                );
            }
            print_report(&report, options.json)
        }
        Command::Manual { values: path, options } => {
            let analyzer = options.analyzer()?;
            let values = analyzer
                .parse_manual_json(&read_file(&path)?)
                .with_context(|| format!("Invalid manual values in {}", path.display()))?;
            let report = analyzer.analyze_values(values, options.metadata()?);
            print_report(&report, options.json)
        }
        Command::Advice => {
            print_advice();
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Could not read file {:?}", path))
}

fn print_report(report: &AnalysisReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Sample: {:.1} h, {}",
        report.metadata.age_hours, report.metadata.storage
    );

    if report.quality_issues.is_empty() {
        println!("No apparent sample quality issues.");
    } else {
        println!("Potential sample quality issues:");
        for issue in &report.quality_issues {
            println!("  - {}", issue.message);
        }
    }

    if report.findings.all.is_empty() {
        println!("\nNo values to analyze.");
        return Ok(());
    }

    println!("\nFindings:");
    for finding in &report.findings.all {
        println!(
            "  {:<42} {:>12} {:<10} {}",
            finding.label,
            finding.value.to_string(),
            finding.unit,
            finding.status
        );
    }

    println!();
    if report.has_abnormal() {
        println!("Abnormalities detected. Recommendations:");
        for finding in &report.findings.abnormal {
            let reading = format!("{} {}", finding.value, finding.unit);
            println!(
                "  - {}: {} ({}) - {}",
                finding.label,
                reading.trim(),
                finding.status,
                finding.suggestion
            );
        }
    } else {
        println!("All values within normal ranges.");
    }

    if let Some(note) = &report.follow_up {
        println!("\n{note}");
    }

    println!("\nFor educational purposes only. Not medical advice.");
    Ok(())
}

fn print_advice() {
    println!("Collection advice:");
    for line in COLLECTION_ADVICE {
        println!("  - {line}");
    }
    println!("\nStorage advice:");
    for line in STORAGE_ADVICE {
        println!("  - {line}");
    }
}
