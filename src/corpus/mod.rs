// src/corpus/mod.rs
//! Stale-document corpus: back-dated clinical documents that still quote the guidance a
//! ground-truth record supersedes.

pub mod templates;

use crate::record::{read_dataset, CanonicalRecord, RiskLevel};
use crate::text::file_stem;
use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use templates::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Local,
}

impl FromStr for OutputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(OutputMode::Local),
            other => bail!("unsupported output mode `{other}` (only `local` is available)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub num_documents: usize,
    /// Documents are back-dated 30 days up to `years` * 365 days.
    pub years: u32,
    pub ground_truth_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: OutputMode,
}

/// Documents written per template.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    pub per_template: BTreeMap<Template, usize>,
}

impl CorpusStats {
    pub fn total(&self) -> usize {
        self.per_template.values().sum()
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in Template::ALL {
            let n = self.per_template.get(&t).copied().unwrap_or(0);
            writeln!(f, "{:<25}: {n} documents", t.key())?;
        }
        write!(f, "{:<25}: {}", "Total Documents Generated", self.total())
    }
}

/// Every `*.csv` under `dir`, concatenated. A missing directory yields no records.
pub fn load_ground_truth(dir: &Path) -> Result<Vec<CanonicalRecord>> {
    if !dir.is_dir() {
        tracing::warn!(target: "corpus", dir = %dir.display(), "ground-truth directory not found");
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|x| x == "csv"))
        .collect();
    files.sort();

    let mut out = Vec::new();
    for f in &files {
        out.extend(read_dataset(f)?);
    }
    tracing::info!(target: "corpus", records = out.len(), files = files.len(), "ground truth loaded");
    Ok(out)
}

/// Used when no ground truth has been harvested yet.
pub fn sample_records(today: NaiveDate) -> Vec<CanonicalRecord> {
    vec![
        CanonicalRecord {
            drug_name: "warfarin".into(),
            condition: "atrial fibrillation".into(),
            old_dosage: "5mg daily".into(),
            new_dosage: "2.5mg daily for elderly".into(),
            old_warning: "Monitor INR monthly".into(),
            new_warning: "Monitor INR weekly for first month".into(),
            risk_level: RiskLevel::Critical,
            patient_population: "Adult patients with AF".into(),
            contraindications: "Active bleeding, pregnancy".into(),
            adverse_events: "Bleeding, bruising".into(),
            mechanism_of_action: "Vitamin K antagonist".into(),
            therapeutic_class: "Anticoagulant".into(),
            manufacturer: "Generic manufacturers".into(),
            regulatory_status: "FDA approved".into(),
            clinical_significance: "Dosing change reduces bleeding risk".into(),
            patient_safety_impact: "Critical - immediate protocol revision".into(),
            compliance_deadline: Some(today + Duration::days(30)),
            fda_approval_date: NaiveDate::from_ymd_opt(1954, 1, 1),
            ..CanonicalRecord::keyed("sample://warfarin", today)
        },
        CanonicalRecord {
            device_name: "Infusion Pump Model XYZ-100".into(),
            recall_reason: "Software error causing over-infusion".into(),
            old_warning: "Standard pump operation".into(),
            new_warning: "RECALL: Discontinue use immediately".into(),
            risk_level: RiskLevel::Critical,
            patient_population: "All patients".into(),
            manufacturer: "MedDevice Corp".into(),
            regulatory_status: "Recalled".into(),
            clinical_significance: "Device replacement required".into(),
            patient_safety_impact: "Critical - potential overdose".into(),
            compliance_deadline: Some(today + Duration::days(7)),
            ..CanonicalRecord::keyed("sample://infusion-pump", today)
        },
        CanonicalRecord {
            drug_name: "metformin".into(),
            condition: "diabetes type 2".into(),
            old_dosage: "1000mg twice daily".into(),
            new_dosage: "500mg twice daily (reduced for CKD)".into(),
            old_warning: "Monitor renal function annually".into(),
            new_warning: "Contraindicated if eGFR < 30".into(),
            old_indication: "Type 2 diabetes".into(),
            new_indication: "Type 2 diabetes with normal renal function".into(),
            risk_level: RiskLevel::High,
            patient_population: "Adults with type 2 diabetes".into(),
            contraindications: "Severe renal impairment, acidosis".into(),
            adverse_events: "Lactic acidosis, GI upset".into(),
            mechanism_of_action: "Biguanide - reduces hepatic glucose".into(),
            therapeutic_class: "Antidiabetic".into(),
            clinical_significance: "Renal dosing adjustment required".into(),
            patient_safety_impact: "High - prevent lactic acidosis".into(),
            compliance_deadline: Some(today + Duration::days(60)),
            ..CanonicalRecord::keyed("sample://metformin", today)
        },
    ]
}

/// `{date}_{template}_{n}_{stem}.txt`, stem = alphanumerics of the first 15 chars of the subject.
pub fn document_file_name(doc_date: NaiveDate, template: Template, n: usize, rec: &CanonicalRecord) -> String {
    let stem = file_stem(rec.subject().unwrap_or("clinical"), 15);
    format!("{}_{}_{}_{}.txt", doc_date.format("%Y-%m-%d"), template.key(), n, stem)
}

pub fn generate<R: Rng + ?Sized>(opts: &CorpusOptions, today: NaiveDate, rng: &mut R) -> Result<CorpusStats> {
    tracing::info!(target: "corpus", mode = ?opts.mode, n = opts.num_documents, years = opts.years, "generating corpus");

    let mut records = load_ground_truth(&opts.ground_truth_dir)?;
    if records.is_empty() {
        tracing::warn!(target: "corpus", "no ground truth records; using built-in samples");
        records = sample_records(today);
    }

    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("creating {}", opts.output_dir.display()))?;

    let max_days = (365 * i64::from(opts.years.max(1))).max(30);
    let mut stats = CorpusStats::default();
    for i in 0..opts.num_documents {
        let Some(rec) = records.choose(rng) else {
            break;
        };
        let template = Template::choose(rec, rng);
        let doc_date = today - Duration::days(rng.random_range(30..=max_days));
        let name = document_file_name(doc_date, template, i + 1, rec);
        let path = opts.output_dir.join(&name);

        let body = template.render(rec, doc_date, rng);
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(target: "corpus", n = i + 1, template = template.key(), file = %name, "document written");
        *stats.per_template.entry(template).or_insert(0) += 1;
    }

    tracing::info!(target: "corpus", total = stats.total(), dir = %opts.output_dir.display(), "corpus generated");
    Ok(stats)
}
