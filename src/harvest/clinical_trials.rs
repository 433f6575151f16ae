// src/harvest/clinical_trials.rs
//! ClinicalTrials.gov v2 study search, one query per condition.

use super::fetch::{FetchRequest, Fetcher};
use super::{Collector, FacetSearch, Harvester, RawItem};
use crate::config::TrialsConfig;
use crate::normalize::{self, NormalizeCtx, NormalizeError};
use crate::record::CanonicalRecord;
use crate::seen::SeenSet;
use anyhow::Result;
use async_trait::async_trait;

pub const SOURCE: &str = "clinical_trials";

pub fn source_url(nct_id: &str) -> String {
    format!("https://clinicaltrials.gov/study/{nct_id}")
}

pub struct ClinicalTrialHarvester {
    cfg: TrialsConfig,
}

impl ClinicalTrialHarvester {
    pub fn new(cfg: TrialsConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Harvester for ClinicalTrialHarvester {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn harvest(&self, fetcher: &dyn Fetcher, seen: &SeenSet) -> Result<Vec<RawItem>> {
        let cfg = &self.cfg.search;
        let search = FacetSearch {
            source: SOURCE,
            results_path: "studies",
            id_path: "protocolSection.identificationModule.nctId",
            cap: cfg.items_per_facet,
            delay: cfg.delay,
        };
        let mut collector = Collector::new(seen);

        for condition in &cfg.facets {
            let req = FetchRequest::new(&cfg.endpoint, cfg.timeout)
                .param("format", "json")
                .param("query.cond", condition)
                .param("query.term", condition)
                .param("filter.overallStatus", &self.cfg.status_filter)
                .param("pageSize", cfg.page_size);
            search.run(fetcher, &mut collector, condition, &req, source_url).await;
        }
        Ok(collector.finish())
    }

    fn normalize(&self, item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
        normalize::clinical_trials::normalize(item, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::harvest::fetch::{FixtureFetcher, FixtureResponse};
    use serde_json::json;
    use std::time::Duration;

    fn study(id: &str) -> serde_json::Value {
        json!({"protocolSection": {"identificationModule": {"nctId": id}}})
    }

    #[tokio::test]
    async fn sends_status_filter_and_keys_by_nct_id() {
        let cfg = TrialsConfig {
            search: SourceConfig {
                endpoint: "https://ct.test/studies".into(),
                facets: vec!["diabetes".into()],
                page_size: 25,
                items_per_facet: 12,
                delay: Duration::ZERO,
                timeout: Duration::from_secs(1),
            },
            status_filter: "RECRUITING".into(),
        };
        let fetcher = FixtureFetcher::new().route_query(
            "https://ct.test/studies",
            "filter.overallStatus",
            "RECRUITING",
            FixtureResponse::Json(json!({"studies": [study("NCT1"), study("NCT2"), study("NCT1")]})),
        );
        let seen = SeenSet::from_persisted([source_url("NCT2")].into_iter().collect());

        let items = ClinicalTrialHarvester::new(cfg).harvest(&fetcher, &seen).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_url, "https://clinicaltrials.gov/study/NCT1");
        assert!(fetcher.calls()[0].contains("query.cond=diabetes"));
    }
}
