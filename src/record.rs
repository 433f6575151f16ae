// src/record.rs
//! Canonical ground-truth record and the per-run CSV dataset it is written to.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Column order of every dataset file. Mirrors the field order of [`CanonicalRecord`].
pub const FIELDNAMES: [&str; 30] = [
    "drug_name",
    "device_name",
    "condition",
    "old_dosage",
    "new_dosage",
    "old_warning",
    "new_warning",
    "old_indication",
    "new_indication",
    "recall_reason",
    "risk_level",
    "fda_approval_date",
    "update_date",
    "source_url",
    "ndc_code",
    "clinical_trial_id",
    "patient_population",
    "contraindications",
    "adverse_events",
    "mechanism_of_action",
    "therapeutic_class",
    "manufacturer",
    "regulatory_status",
    "clinical_significance",
    "patient_safety_impact",
    "compliance_deadline",
    "adverse_event_count",
    "recall_class",
    "trial_phase",
    "study_status",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized row. Empty strings stand for "not provided by this source".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub drug_name: String,
    pub device_name: String,
    pub condition: String,
    pub old_dosage: String,
    pub new_dosage: String,
    pub old_warning: String,
    pub new_warning: String,
    pub old_indication: String,
    pub new_indication: String,
    pub recall_reason: String,
    pub risk_level: RiskLevel,
    pub fda_approval_date: Option<NaiveDate>,
    pub update_date: NaiveDate,
    pub source_url: String,
    pub ndc_code: String,
    pub clinical_trial_id: String,
    pub patient_population: String,
    pub contraindications: String,
    pub adverse_events: String,
    pub mechanism_of_action: String,
    pub therapeutic_class: String,
    pub manufacturer: String,
    pub regulatory_status: String,
    pub clinical_significance: String,
    pub patient_safety_impact: String,
    pub compliance_deadline: Option<NaiveDate>,
    pub adverse_event_count: u32,
    pub recall_class: String,
    pub trial_phase: String,
    pub study_status: String,
}

impl CanonicalRecord {
    /// Empty record keyed by `source_url`; normalizers fill the rest with struct-update syntax.
    pub fn keyed(source_url: impl Into<String>, update_date: NaiveDate) -> Self {
        Self {
            drug_name: String::new(),
            device_name: String::new(),
            condition: String::new(),
            old_dosage: String::new(),
            new_dosage: String::new(),
            old_warning: String::new(),
            new_warning: String::new(),
            old_indication: String::new(),
            new_indication: String::new(),
            recall_reason: String::new(),
            risk_level: RiskLevel::Medium,
            fda_approval_date: None,
            update_date,
            source_url: source_url.into(),
            ndc_code: String::new(),
            clinical_trial_id: String::new(),
            patient_population: String::new(),
            contraindications: String::new(),
            adverse_events: String::new(),
            mechanism_of_action: String::new(),
            therapeutic_class: String::new(),
            manufacturer: String::new(),
            regulatory_status: String::new(),
            clinical_significance: String::new(),
            patient_safety_impact: String::new(),
            compliance_deadline: None,
            adverse_event_count: 0,
            recall_class: String::new(),
            trial_phase: String::new(),
            study_status: String::new(),
        }
    }

    /// The most specific subject name: drug, then device, then condition.
    pub fn subject(&self) -> Option<&str> {
        [&self.drug_name, &self.device_name, &self.condition]
            .into_iter()
            .map(|s| s.as_str())
            .find(|s| !s.trim().is_empty())
    }
}

/// Write `records` to a new CSV file at `path`. The header is always written, even for an empty
/// batch. Fails if `path` already exists; dataset files are never overwritten.
pub fn write_dataset(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let file = File::options()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("creating dataset {}", path.display()))?;

    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    w.write_record(FIELDNAMES)
        .with_context(|| format!("writing header to {}", path.display()))?;
    for rec in records {
        w.serialize(rec)
            .with_context(|| format!("writing row {} to {}", rec.source_url, path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Read a dataset file. Rows that fail to deserialize are skipped with a warning.
pub fn read_dataset(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("opening dataset {}", path.display()))?;
    let mut out = Vec::new();
    for (i, row) in rdr.deserialize::<CanonicalRecord>().enumerate() {
        match row {
            Ok(rec) => out.push(rec),
            Err(e) => {
                tracing::warn!(error = %e, row = i + 1, file = %path.display(), "skipping malformed dataset row")
            }
        }
    }
    Ok(out)
}
