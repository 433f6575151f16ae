// src/harvest/mod.rs
pub mod adverse_events;
pub mod clinical_trials;
pub mod device_recalls;
pub mod drug_labels;
pub mod fetch;

use crate::config::SourceCatalog;
use crate::harvest::fetch::{FetchError, FetchOutcome, FetchRequest, Fetcher};
use crate::normalize::{NormalizeCtx, NormalizeError};
use crate::record::CanonicalRecord;
use crate::seen::SeenSet;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "harvest_facet_requests_total",
            "Search requests issued, one per facet."
        );
        describe_counter!(
            "harvest_facet_errors_total",
            "Facet requests that failed (status, transport, decode)."
        );
        describe_counter!("harvest_items_total", "Records accepted into the batch.");
        describe_counter!(
            "harvest_items_skipped_total",
            "Items dropped for missing identifiers or normalization errors."
        );
        describe_counter!(
            "harvest_dedup_total",
            "Items dropped because their source URL was already seen."
        );
        describe_counter!(
            "harvest_demo_records_total",
            "Demo scenarios appended by backfill."
        );
        describe_gauge!("harvest_last_run_ts", "Unix ts when a harvest run last finished.");
    });
}

/// A source-native payload plus the canonical URL derived for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub source_url: String,
    pub payload: Value,
    /// The facet whose query produced this item.
    pub facet: String,
    /// Facet grouping where the source has one (drug-label category).
    pub category: Option<String>,
}

#[async_trait::async_trait]
pub trait Harvester: Send + Sync {
    fn name(&self) -> &'static str;

    /// Query every facet in order and return items whose URL is not in `seen`.
    async fn harvest(&self, fetcher: &dyn Fetcher, seen: &SeenSet) -> Result<Vec<RawItem>>;

    /// Map one item into the canonical schema.
    fn normalize(&self, item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError>;
}

/// Harvesters for the whole catalog, in run order.
pub fn builtin_harvesters(catalog: &SourceCatalog) -> Vec<Box<dyn Harvester>> {
    vec![
        Box::new(drug_labels::DrugLabelHarvester::new(catalog.drug_labels.clone())),
        Box::new(adverse_events::AdverseEventHarvester::new(
            catalog.adverse_events.clone(),
        )),
        Box::new(device_recalls::DeviceRecallHarvester::new(
            catalog.device_recalls.clone(),
        )),
        Box::new(clinical_trials::ClinicalTrialHarvester::new(
            catalog.clinical_trials.clone(),
        )),
    ]
}

/// Issue one facet request, then pause for `delay`.
///
/// `Some(body)` on 200. `None` when the facet yields nothing: 404 (empty result set) or a
/// failure (non-200 status, timeout, transport error, undecodable body), which is logged.
pub(crate) async fn fetch_facet(
    fetcher: &dyn Fetcher,
    req: &FetchRequest,
    source: &'static str,
    facet: &str,
    delay: Duration,
) -> Option<Value> {
    counter!("harvest_facet_requests_total", "source" => source).increment(1);
    let outcome = fetcher.get_json(req).await;
    pause(delay).await;

    match outcome {
        Ok(FetchOutcome::Json(body)) => Some(body),
        Ok(FetchOutcome::NotFound) => {
            tracing::info!(target: "harvest", source, facet, "no results for facet");
            None
        }
        Err(e) => {
            log_fetch_error(source, facet, &e);
            None
        }
    }
}

pub(crate) fn log_fetch_error(source: &'static str, facet: &str, e: &FetchError) {
    tracing::warn!(target: "harvest", source, facet, error = %e, "facet request failed; skipping");
    counter!("harvest_facet_errors_total", "source" => source).increment(1);
}

/// Scoped inter-request pause; the next request is not issued until it elapses.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub(crate) fn skip_item(source: &'static str, facet: &str, reason: &str) {
    tracing::debug!(target: "harvest", source, facet, reason, "skipping item");
    counter!("harvest_items_skipped_total", "source" => source).increment(1);
}

/// Identifiers become seen-set lines; blank ones or ones with inner whitespace are unusable.
pub(crate) fn usable_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

pub(crate) fn count_duplicate(source: &'static str, url: &str) {
    tracing::debug!(target: "harvest", source, url, "already seen");
    counter!("harvest_dedup_total", "source" => source).increment(1);
}

/// Shape shared by the single-GET sources: a result array at `results_path`, each entry
/// identified by the scalar at `id_path`.
pub(crate) struct FacetSearch {
    pub source: &'static str,
    pub results_path: &'static str,
    pub id_path: &'static str,
    pub cap: usize,
    pub delay: Duration,
}

impl FacetSearch {
    /// Run one facet query and feed its first `cap` novel results into `collector`.
    pub(crate) async fn run(
        &self,
        fetcher: &dyn Fetcher,
        collector: &mut Collector<'_>,
        facet: &str,
        req: &FetchRequest,
        url_for: impl Fn(&str) -> String,
    ) {
        let Some(body) = fetch_facet(fetcher, req, self.source, facet, self.delay).await else {
            return;
        };
        let results = crate::extract::extract_list(&body, self.results_path);
        tracing::info!(target: "harvest", source = self.source, facet, count = results.len(), "facet results");

        for entry in results.iter().take(self.cap) {
            let id = crate::extract::extract_nonempty(entry, self.id_path, "");
            if !usable_id(&id) {
                skip_item(self.source, facet, "missing identifier");
                continue;
            }
            let url = url_for(&id);
            if !collector.is_novel(&url) {
                count_duplicate(self.source, &url);
                continue;
            }
            collector.push(RawItem {
                source_url: url,
                payload: entry.clone(),
                facet: facet.to_string(),
                category: None,
            });
        }
    }
}

/// Collects items for one harvest call, dropping URLs already seen in earlier runs or already
/// emitted by an earlier facet of the same call.
pub(crate) struct Collector<'a> {
    seen: &'a SeenSet,
    emitted: HashSet<String>,
    items: Vec<RawItem>,
}

impl<'a> Collector<'a> {
    pub(crate) fn new(seen: &'a SeenSet) -> Self {
        Self {
            seen,
            emitted: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// True when `url` is new to both the seen-set and this call.
    pub(crate) fn is_novel(&self, url: &str) -> bool {
        !self.seen.contains(url) && !self.emitted.contains(url)
    }

    pub(crate) fn push(&mut self, item: RawItem) {
        if self.emitted.insert(item.source_url.clone()) {
            self.items.push(item);
        }
    }

    pub(crate) fn finish(self) -> Vec<RawItem> {
        self.items
    }
}
