// src/orchestrator.rs
//! One harvest run: INIT -> HARVESTING (one source at a time) -> BACKFILLING -> PERSISTING -> DONE.

use crate::config::{HarvestSettings, SourceCatalog};
use crate::demo;
use crate::harvest::fetch::Fetcher;
use crate::harvest::{builtin_harvesters, count_duplicate, ensure_metrics_described, skip_item, Harvester};
use crate::normalize::NormalizeCtx;
use crate::record::{write_dataset, CanonicalRecord};
use crate::seen::{SeenError, SeenSet};
use chrono::{Local, NaiveDateTime};
use metrics::{counter, gauge};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("cannot load seen-set")]
    SeenLoad(#[source] SeenError),
    #[error("cannot create output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write dataset {}", path.display())]
    DatasetWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTally {
    pub source: &'static str,
    pub new_items: usize,
    /// Items dropped for normalization errors.
    pub skipped: usize,
    /// The harvester itself returned an error; counted as zero items.
    pub failed: bool,
}

#[derive(Debug)]
pub struct HarvestReport {
    pub sources: Vec<SourceTally>,
    pub demo_records: usize,
    pub total: usize,
    pub dataset_path: PathBuf,
    pub seen_appended: usize,
    /// Set when the seen-set append failed; the dataset was still written.
    pub seen_append_error: Option<String>,
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.sources {
            let note = if s.failed { " (source failed)" } else { "" };
            writeln!(f, "  {:<16} {:>4} new{}", s.source, s.new_items, note)?;
        }
        writeln!(f, "  {:<16} {:>4}", "demo scenarios", self.demo_records)?;
        writeln!(f, "Total persisted: {}", self.total)?;
        write!(f, "Dataset: {}", self.dataset_path.display())?;
        if let Some(e) = &self.seen_append_error {
            write!(f, "\nWARNING: seen-set not updated ({e}); next run may repeat these items")?;
        }
        Ok(())
    }
}

pub struct Orchestrator {
    settings: HarvestSettings,
    harvesters: Vec<Box<dyn Harvester>>,
    fetcher: Box<dyn Fetcher>,
}

impl Orchestrator {
    pub fn new(
        settings: HarvestSettings,
        harvesters: Vec<Box<dyn Harvester>>,
        fetcher: Box<dyn Fetcher>,
    ) -> Self {
        Self {
            settings,
            harvesters,
            fetcher,
        }
    }

    /// Orchestrator over the four built-in sources of `catalog`.
    pub fn from_catalog(settings: HarvestSettings, catalog: &SourceCatalog, fetcher: Box<dyn Fetcher>) -> Self {
        Self::new(settings, builtin_harvesters(catalog), fetcher)
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    pub async fn run(&self, force_demo: bool) -> Result<HarvestReport, HarvestError> {
        self.run_at(Local::now().naive_local(), force_demo).await
    }

    /// Run with an explicit wall clock (dataset timestamp, "today" for normalizers).
    pub async fn run_at(&self, now: NaiveDateTime, force_demo: bool) -> Result<HarvestReport, HarvestError> {
        ensure_metrics_described();
        let ctx = NormalizeCtx::new(now.date());

        // INIT
        let mut seen = SeenSet::load(&self.settings.state_file).map_err(HarvestError::SeenLoad)?;
        std::fs::create_dir_all(&self.settings.output_dir).map_err(|source| HarvestError::OutputDir {
            path: self.settings.output_dir.clone(),
            source,
        })?;
        tracing::info!(
            target: "harvest",
            seen = seen.persisted_len(),
            state_file = %self.settings.state_file.display(),
            "INIT: seen-set loaded"
        );

        // HARVESTING
        let mut batch: Vec<CanonicalRecord> = Vec::new();
        let mut sources = Vec::with_capacity(self.harvesters.len());
        for h in &self.harvesters {
            tracing::info!(target: "harvest", source = h.name(), "HARVESTING");
            sources.push(self.harvest_source(h.as_ref(), &ctx, &mut seen, &mut batch).await);
        }

        // BACKFILLING
        let harvested = batch.len();
        let mut demo_records = 0usize;
        if force_demo || harvested < self.settings.min_records {
            tracing::info!(target: "harvest", harvested, min = self.settings.min_records, force_demo, "BACKFILLING");
            for rec in demo::scenarios(ctx.today) {
                if seen.insert(&rec.source_url) {
                    batch.push(rec);
                    demo_records += 1;
                } else {
                    count_duplicate("demo", &rec.source_url);
                }
            }
            counter!("harvest_demo_records_total").increment(demo_records as u64);
        }

        // PERSISTING
        let dataset_path = next_dataset_path(&self.settings.output_dir, now);
        tracing::info!(target: "harvest", count = batch.len(), path = %dataset_path.display(), "PERSISTING");
        write_dataset(&dataset_path, &batch).map_err(|source| HarvestError::DatasetWrite {
            path: dataset_path.clone(),
            source,
        })?;

        let (seen_appended, seen_append_error) = match seen.persist_fresh(&self.settings.state_file) {
            Ok(n) => (n, None),
            Err(e) => {
                tracing::warn!(target: "harvest", error = %e, "seen-set append failed; dataset kept");
                (0, Some(e.to_string()))
            }
        };

        gauge!("harvest_last_run_ts").set(Local::now().timestamp() as f64);
        tracing::info!(target: "harvest", total = batch.len(), demo_records, "DONE");

        Ok(HarvestReport {
            sources,
            demo_records,
            total: batch.len(),
            dataset_path,
            seen_appended,
            seen_append_error,
        })
    }

    async fn harvest_source(
        &self,
        h: &dyn Harvester,
        ctx: &NormalizeCtx,
        seen: &mut SeenSet,
        batch: &mut Vec<CanonicalRecord>,
    ) -> SourceTally {
        let source = h.name();
        let mut tally = SourceTally {
            source,
            new_items: 0,
            skipped: 0,
            failed: false,
        };

        let items = match h.harvest(self.fetcher.as_ref(), seen).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "harvest", source, error = ?e, "source failed; continuing with next");
                tally.failed = true;
                return tally;
            }
        };

        for item in &items {
            if seen.contains(&item.source_url) {
                count_duplicate(source, &item.source_url);
                continue;
            }
            match h.normalize(item, ctx) {
                Ok(rec) => {
                    seen.insert(&item.source_url);
                    batch.push(rec);
                    tally.new_items += 1;
                }
                Err(e) => {
                    skip_item(source, &item.facet, &e.to_string());
                    tally.skipped += 1;
                }
            }
        }

        counter!("harvest_items_total", "source" => source).increment(tally.new_items as u64);
        tracing::info!(target: "harvest", source, count = tally.new_items, "new items");
        tally
    }
}

/// `clinical_ground_truth_{YYYY-MM-DD_HHMMSS}.csv`, suffixed `_2`, `_3`, ... if taken.
pub fn next_dataset_path(dir: &Path, now: NaiveDateTime) -> PathBuf {
    let stamp = now.format("%Y-%m-%d_%H%M%S");
    let first = dir.join(format!("clinical_ground_truth_{stamp}.csv"));
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| dir.join(format!("clinical_ground_truth_{stamp}_{n}.csv")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn dataset_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = next_dataset_path(dir.path(), at(9, 5, 7));
        assert!(a.ends_with("clinical_ground_truth_2025-02-03_090507.csv"));
        std::fs::write(&a, "x").unwrap();
        let b = next_dataset_path(dir.path(), at(9, 5, 7));
        assert!(b.ends_with("clinical_ground_truth_2025-02-03_090507_2.csv"));
    }

    #[test]
    fn report_summary_mentions_failures() {
        let r = HarvestReport {
            sources: vec![SourceTally {
                source: "drug_labels",
                new_items: 0,
                skipped: 0,
                failed: true,
            }],
            demo_records: 4,
            total: 4,
            dataset_path: PathBuf::from("out.csv"),
            seen_appended: 4,
            seen_append_error: None,
        };
        let text = r.to_string();
        assert!(text.contains("(source failed)"));
        assert!(text.contains("Total persisted: 4"));
    }
}
