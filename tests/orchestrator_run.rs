// tests/orchestrator_run.rs
use chrono::{NaiveDate, NaiveDateTime};
use clinical_ground_truth::config::{HarvestSettings, SourceCatalog};
use clinical_ground_truth::demo::{self, SCENARIO_COUNT};
use clinical_ground_truth::harvest::fetch::{Fetcher, FixtureFetcher, FixtureResponse};
use clinical_ground_truth::harvest::{Harvester, RawItem};
use clinical_ground_truth::normalize::{NormalizeCtx, NormalizeError};
use clinical_ground_truth::record::read_dataset;
use clinical_ground_truth::{seen, CanonicalRecord, Orchestrator, SeenSet, FIELDNAMES};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;

const AE: &str = "https://ae.test/event.json";
const RECALL: &str = "https://recall.test/recall.json";
const LABELS: &str = "https://dm.test/v2";
const TRIALS: &str = "https://ct.test/studies";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn catalog() -> SourceCatalog {
    let mut c = SourceCatalog::builtin().without_delays();
    c.adverse_events.endpoint = AE.into();
    c.adverse_events.facets = vec!["serious:1".into()];
    c.device_recalls.endpoint = RECALL.into();
    c.device_recalls.facets = vec!["product_classification:\"II\"".into()];
    c.drug_labels.base_url = LABELS.into();
    c.drug_labels.categories = vec![("high_risk_drugs".into(), vec!["warfarin".into()])];
    c.clinical_trials.search.endpoint = TRIALS.into();
    c.clinical_trials.search.facets = vec!["diabetes".into()];
    for t in [
        &mut c.adverse_events.timeout,
        &mut c.device_recalls.timeout,
        &mut c.drug_labels.timeout,
        &mut c.clinical_trials.search.timeout,
    ] {
        *t = Duration::from_secs(1);
    }
    c
}

/// 2 adverse events (one repeated), 1 recall, 1 label, 1 trial.
fn fixtures() -> FixtureFetcher {
    FixtureFetcher::new()
        .route(
            AE,
            FixtureResponse::Json(json!({"results": [
                {"safetyreportid": "100", "serious": "1", "patient": {"drug": [{"medicinalproduct": "WARFARIN"}]}},
                {"safetyreportid": "101", "patient": {"drug": [{"medicinalproduct": "ASPIRIN"}]}},
                {"safetyreportid": "100", "serious": "1"}
            ]})),
        )
        .route(
            RECALL,
            FixtureResponse::Json(json!({"results": [
                {"recall_number": "Z-1", "classification": "Class I", "product_description": "Pump"}
            ]})),
        )
        .route(
            &format!("{LABELS}/spls.json"),
            FixtureResponse::Json(json!({"data": [{"setid": "s1", "title": "WARFARIN tablet"}]})),
        )
        .route(&format!("{LABELS}/spls/s1.json"), FixtureResponse::Json(json!({})))
        .route(
            TRIALS,
            FixtureResponse::Json(json!({"studies": [
                {"protocolSection": {"identificationModule": {"nctId": "NCT1", "briefTitle": "Trial"}}}
            ]})),
        )
}

fn settings(dir: &Path, min_records: usize) -> HarvestSettings {
    HarvestSettings {
        output_dir: dir.join("out"),
        state_file: dir.join("seen.txt"),
        min_records,
        corpus_dir: dir.join("corpus"),
    }
}

fn orchestrator(dir: &Path, min_records: usize, fetcher: FixtureFetcher) -> Orchestrator {
    Orchestrator::from_catalog(settings(dir, min_records), &catalog(), Box::new(fetcher))
}

fn header(path: &Path) -> String {
    fs::read_to_string(path).unwrap().lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn harvests_every_source_and_dedups_within_run() {
    let dir = tempfile::tempdir().unwrap();
    let report = orchestrator(dir.path(), 0, fixtures()).run_at(now(), false).await.unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.demo_records, 0);
    let by_source: Vec<_> = report.sources.iter().map(|s| (s.source, s.new_items)).collect();
    assert_eq!(
        by_source,
        vec![("drug_labels", 1), ("adverse_events", 2), ("device_recalls", 1), ("clinical_trials", 1)]
    );

    let records = read_dataset(&report.dataset_path).unwrap();
    assert_eq!(records.len(), 5);
    let mut urls: Vec<_> = records.iter().map(|r| r.source_url.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 5);

    let persisted = seen::load(&dir.path().join("seen.txt")).unwrap();
    assert_eq!(persisted.len(), 5);
    assert_eq!(report.seen_appended, 5);
}

#[tokio::test]
async fn second_run_over_same_data_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    orchestrator(dir.path(), 0, fixtures()).run_at(now(), false).await.unwrap();
    let second = orchestrator(dir.path(), 0, fixtures()).run_at(now(), false).await.unwrap();

    assert_eq!(second.total, 0);
    assert!(second.dataset_path.ends_with("clinical_ground_truth_2025-06-01_120000_2.csv"));
    assert_eq!(header(&second.dataset_path), FIELDNAMES.join(","));
    assert!(read_dataset(&second.dataset_path).unwrap().is_empty());
    assert_eq!(seen::load(&dir.path().join("seen.txt")).unwrap().len(), 5);
}

#[tokio::test]
async fn thin_harvest_is_backfilled_once() {
    let dir = tempfile::tempdir().unwrap();
    let report = orchestrator(dir.path(), 15, fixtures()).run_at(now(), false).await.unwrap();
    assert_eq!(report.demo_records, SCENARIO_COUNT);
    assert_eq!(report.total, 5 + SCENARIO_COUNT);

    let records = read_dataset(&report.dataset_path).unwrap();
    assert!(records.iter().any(|r| r.source_url == demo::source_url(0)));

    // Demo URLs are in the seen-set now; a forced backfill adds nothing new.
    let again = orchestrator(dir.path(), 15, FixtureFetcher::new()).run_at(now(), true).await.unwrap();
    assert_eq!(again.demo_records, 0);
    assert_eq!(again.total, 0);
}

#[tokio::test]
async fn all_sources_down_still_writes_demo_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = FixtureFetcher::new()
        .route(AE, FixtureResponse::Status(500))
        .route(RECALL, FixtureResponse::Status(503))
        .route(TRIALS, FixtureResponse::Body("<html>".into()));

    let report = orchestrator(dir.path(), 15, fetcher).run_at(now(), false).await.unwrap();

    assert!(report.sources.iter().all(|s| s.new_items == 0));
    assert_eq!(report.total, SCENARIO_COUNT);
    assert_eq!(header(&report.dataset_path), FIELDNAMES.join(","));
}

#[tokio::test]
async fn unwritable_output_dir_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("out");
    fs::write(&blocker, "not a directory").unwrap();

    let err = orchestrator(dir.path(), 0, fixtures()).run_at(now(), false).await.unwrap_err();
    assert!(err.to_string().contains("output directory"));
    assert!(!dir.path().join("seen.txt").exists());
}

/// Fixed URL list, or an error for the whole source.
struct Canned {
    name: &'static str,
    urls: &'static [&'static str],
    fail: bool,
}

#[async_trait::async_trait]
impl Harvester for Canned {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn harvest(&self, _fetcher: &dyn Fetcher, seen: &SeenSet) -> anyhow::Result<Vec<RawItem>> {
        if self.fail {
            anyhow::bail!("upstream exploded");
        }
        Ok(self
            .urls
            .iter()
            .filter(|u| !seen.contains(u))
            .map(|u| RawItem {
                source_url: u.to_string(),
                payload: json!({}),
                facet: "all".into(),
                category: None,
            })
            .collect())
    }

    fn normalize(&self, item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
        Ok(CanonicalRecord {
            therapeutic_class: self.name.to_string(),
            ..CanonicalRecord::keyed(item.source_url.clone(), ctx.today)
        })
    }
}

#[tokio::test]
async fn url_shared_by_two_sources_is_kept_once_and_failing_source_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let harvesters: Vec<Box<dyn Harvester>> = vec![
        Box::new(Canned { name: "first", urls: &["https://u/1", "https://u/2"], fail: false }),
        Box::new(Canned { name: "broken", urls: &["https://u/9"], fail: true }),
        Box::new(Canned { name: "last", urls: &["https://u/2", "https://u/3"], fail: false }),
    ];
    let orch = Orchestrator::new(settings(dir.path(), 0), harvesters, Box::new(FixtureFetcher::new()));
    let report = orch.run_at(now(), false).await.unwrap();

    let tallies: Vec<_> = report.sources.iter().map(|s| (s.source, s.new_items, s.failed)).collect();
    assert_eq!(tallies, vec![("first", 2, false), ("broken", 0, true), ("last", 1, false)]);
    assert_eq!(report.total, 3);

    let records = read_dataset(&report.dataset_path).unwrap();
    let owners: Vec<_> = records
        .iter()
        .map(|r| (r.source_url.as_str(), r.therapeutic_class.as_str()))
        .collect();
    assert_eq!(owners, vec![("https://u/1", "first"), ("https://u/2", "first"), ("https://u/3", "last")]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn seen_set_append_failure_keeps_dataset() {
    // Readable but never appendable.
    let state = Path::new("/proc/version");
    if !state.exists() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let settings = HarvestSettings {
        state_file: state.to_path_buf(),
        ..settings(dir.path(), 15)
    };

    let report = Orchestrator::from_catalog(settings, &catalog(), Box::new(FixtureFetcher::new()))
        .run_at(now(), false)
        .await
        .unwrap();

    assert_eq!(report.total, SCENARIO_COUNT);
    assert!(report.dataset_path.exists());
    assert_eq!(report.seen_appended, 0);
    assert!(report.seen_append_error.is_some());
    assert!(report.to_string().contains("seen-set not updated"));
    assert_eq!(read_dataset(&report.dataset_path).unwrap().len(), SCENARIO_COUNT);
}
