//! # Record Input and Report Output
//!
//! Reads user records from disk and writes scoring results back out:
//! - a single record from a `.toml` or `.json` file,
//! - a batch of records from a tab-separated file whose header names the
//!   [`RawUserInput`] fields,
//! - a tab-separated results table, one line per batch record.

use crate::input::RawUserInput;
use crate::pipeline::{RiskReport, ScoreStatus, ScoringError};
use crate::tier::RiskTier;
use crate::types::Condition;
use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML record: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to parse JSON record: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to read or write tab-separated records: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Unsupported record file '{}': expected a .toml or .json extension", .0.display())]
    UnsupportedExtension(PathBuf),
}

/// Reads one [`RawUserInput`] from a TOML or JSON file, chosen by extension.
///
/// The record is parsed, not validated; validation belongs to the scoring pass.
pub fn load_user_input(path: &Path) -> Result<RawUserInput, RecordError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let text = fs::read_to_string(path)?;
    match extension.as_deref() {
        Some("toml") => Ok(toml::from_str(&text)?),
        Some("json") => Ok(serde_json::from_str(&text)?),
        _ => Err(RecordError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// One parsed line of a batch file; a malformed line keeps its own error.
pub type BatchRecord = Result<RawUserInput, csv::Error>;

/// Reads every record of a tab-separated batch file.
///
/// An unreadable header fails the whole batch. A malformed data line only fails
/// its own entry, so the remaining records can still be scored.
pub fn read_batch<R: Read>(reader: R) -> Result<Vec<BatchRecord>, RecordError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;
    Ok(csv_reader.deserialize().collect())
}

/// One line of the batch results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    /// 1-based position of the record in the input file.
    pub record: usize,
    /// `scored`, `unknown` or `error`.
    pub status: &'static str,
    pub bmi: Option<f64>,
    pub hypertension: Option<f64>,
    pub obesity: Option<f64>,
    pub diabetes: Option<f64>,
    pub hyperlipidemia: Option<f64>,
    pub hypertension_tier: Option<RiskTier>,
    pub obesity_tier: Option<RiskTier>,
    pub diabetes_tier: Option<RiskTier>,
    pub hyperlipidemia_tier: Option<RiskTier>,
    pub diagnostics: usize,
    /// Error message for records that could not be scored.
    pub error: String,
}

impl BatchRow {
    pub fn from_result(record: usize, result: &Result<RiskReport, ScoringError>) -> Self {
        match result {
            Ok(report) => {
                let risk = |c: Condition| Some(report.risks.get(c));
                let tier = |c: Condition| Some(report.tiers.get(c));
                Self {
                    record,
                    status: match report.status {
                        ScoreStatus::Scored => "scored",
                        ScoreStatus::Unknown => "unknown",
                    },
                    bmi: Some(report.features.bmi),
                    hypertension: risk(Condition::Hypertension),
                    obesity: risk(Condition::Obesity),
                    diabetes: risk(Condition::Diabetes),
                    hyperlipidemia: risk(Condition::Hyperlipidemia),
                    hypertension_tier: tier(Condition::Hypertension),
                    obesity_tier: tier(Condition::Obesity),
                    diabetes_tier: tier(Condition::Diabetes),
                    hyperlipidemia_tier: tier(Condition::Hyperlipidemia),
                    diagnostics: report.diagnostics.len(),
                    error: String::new(),
                }
            }
            Err(err) => Self::failed(record, err.to_string()),
        }
    }

    /// A row for a record that produced no report.
    pub fn failed(record: usize, error: String) -> Self {
        Self {
            record,
            status: "error",
            bmi: None,
            hypertension: None,
            obesity: None,
            diabetes: None,
            hyperlipidemia: None,
            hypertension_tier: None,
            obesity_tier: None,
            diabetes_tier: None,
            hyperlipidemia_tier: None,
            diagnostics: 0,
            error,
        }
    }
}

/// Writes batch rows as a tab-separated table with a header line.
pub fn write_batch<W: Write>(writer: W, rows: &[BatchRow]) -> Result<(), RecordError> {
    let mut csv_writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
