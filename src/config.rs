// src/config.rs
//! Run settings (file/env layered) and the built-in source catalog.
//!
//! Settings cover where things live on disk. The catalog covers what is asked of each upstream
//! API; it is built in code and handed to the harvesters, never read from the settings file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "CGT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/harvest.toml";

fn default_output_dir() -> PathBuf {
    PathBuf::from("clinical_ground_truth")
}
fn default_state_file() -> PathBuf {
    PathBuf::from("clinical_seen_urls.txt")
}
fn default_min_records() -> usize {
    15
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("clinical_document_corpus")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarvestSettings {
    /// Directory receiving one timestamped dataset file per run.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Append-only seen-set file.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Below this many harvested records the demo scenarios are appended.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    /// Output directory of the document corpus generator.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            state_file: default_state_file(),
            min_records: default_min_records(),
            corpus_dir: default_corpus_dir(),
        }
    }
}

impl HarvestSettings {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// 1) $CGT_CONFIG_PATH
    /// 2) config/harvest.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    /// Explicit path wins over the default resolution.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(p) => Self::load_from(p),
            None => Self::load_default(),
        }
    }
}

/// One search endpoint queried once per facet.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: String,
    pub facets: Vec<String>,
    /// `limit` / `pageSize` sent upstream.
    pub page_size: u32,
    /// Results consumed per facet.
    pub items_per_facet: usize,
    /// Pause after every facet request.
    pub delay: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DrugLabelConfig {
    /// DailyMed services root; search is `{base}/spls.json`, detail `{base}/spls/{setid}.json`.
    pub base_url: String,
    /// (category, drugs) in harvest order.
    pub categories: Vec<(String, Vec<String>)>,
    pub items_per_facet: usize,
    pub delay: Duration,
    pub timeout: Duration,
}

impl DrugLabelConfig {
    pub fn search_url(&self) -> String {
        format!("{}/spls.json", self.base_url.trim_end_matches('/'))
    }

    pub fn detail_url(&self, setid: &str) -> String {
        format!("{}/spls/{}.json", self.base_url.trim_end_matches('/'), setid)
    }
}

#[derive(Debug, Clone)]
pub struct TrialsConfig {
    pub search: SourceConfig,
    pub status_filter: String,
}

#[derive(Debug, Clone)]
pub struct SourceCatalog {
    pub adverse_events: SourceConfig,
    pub device_recalls: SourceConfig,
    pub drug_labels: DrugLabelConfig,
    pub clinical_trials: TrialsConfig,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SourceCatalog {
    pub fn builtin() -> Self {
        let categories = [
            (
                "high_risk_drugs",
                &["warfarin", "insulin", "digoxin", "lithium"][..],
            ),
            (
                "oncology_drugs",
                &["pembrolizumab", "nivolumab", "bevacizumab", "trastuzumab"][..],
            ),
            (
                "cardiac_drugs",
                &["metoprolol", "amlodipine", "losartan", "clopidogrel"][..],
            ),
            (
                "psychiatric_drugs",
                &["sertraline", "escitalopram", "aripiprazole", "quetiapine"][..],
            ),
        ]
        .iter()
        .map(|(c, drugs)| (c.to_string(), strings(drugs)))
        .collect();

        Self {
            adverse_events: SourceConfig {
                endpoint: "https://api.fda.gov/drug/event.json".into(),
                facets: strings(&[
                    "patient.reaction.reactionmeddrapt:headache",
                    "patient.reaction.reactionmeddrapt:nausea",
                    "patient.reaction.reactionmeddrapt:dizziness",
                    "patient.reaction.reactionmeddrapt:rash",
                    "serious:1",
                    "seriousnesslifethreatening:1",
                ]),
                page_size: 25,
                items_per_facet: 8,
                delay: Duration::from_secs(2),
                timeout: Duration::from_secs(15),
            },
            device_recalls: SourceConfig {
                endpoint: "https://api.fda.gov/device/recall.json".into(),
                facets: strings(&[
                    r#"root_cause_description.exact:"Device Design""#,
                    r#"root_cause_description.exact:"Software""#,
                    r#"root_cause_description.exact:"Manufacturing""#,
                    r#"product_classification:"II""#,
                ]),
                page_size: 30,
                items_per_facet: 10,
                delay: Duration::from_secs(2),
                timeout: Duration::from_secs(15),
            },
            drug_labels: DrugLabelConfig {
                base_url: "https://dailymed.nlm.nih.gov/dailymed/services/v2".into(),
                categories,
                items_per_facet: 3,
                delay: Duration::from_millis(1500),
                timeout: Duration::from_secs(15),
            },
            clinical_trials: TrialsConfig {
                search: SourceConfig {
                    endpoint: "https://clinicaltrials.gov/api/v2/studies".into(),
                    facets: strings(&["lung cancer", "breast cancer", "diabetes", "hypertension"]),
                    page_size: 25,
                    items_per_facet: 12,
                    delay: Duration::from_secs(3),
                    timeout: Duration::from_secs(20),
                },
                status_filter: "RECRUITING,ACTIVE_NOT_RECRUITING,COMPLETED".into(),
            },
        }
    }

    /// Same catalog with every inter-request pause removed (tests, fixture runs).
    pub fn without_delays(mut self) -> Self {
        self.adverse_events.delay = Duration::ZERO;
        self.device_recalls.delay = Duration::ZERO;
        self.drug_labels.delay = Duration::ZERO;
        self.clinical_trials.search.delay = Duration::ZERO;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let s: HarvestSettings = toml::from_str(r#"min_records = 3"#).unwrap();
        assert_eq!(s.min_records, 3);
        assert_eq!(s.output_dir, PathBuf::from("clinical_ground_truth"));
        assert_eq!(s.state_file, PathBuf::from("clinical_seen_urls.txt"));
    }

    #[test]
    fn builtin_catalog_shape() {
        let c = SourceCatalog::builtin();
        assert_eq!(c.drug_labels.categories.len(), 4);
        assert!(c.drug_labels.categories.iter().all(|(_, d)| d.len() == 4));
        assert_eq!(
            c.drug_labels.detail_url("abc"),
            "https://dailymed.nlm.nih.gov/dailymed/services/v2/spls/abc.json"
        );
        let quiet = c.without_delays();
        assert_eq!(quiet.clinical_trials.search.delay, Duration::ZERO);
    }
}
