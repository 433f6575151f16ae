// src/harvest/adverse_events.rs
//! openFDA drug adverse-event reports, one search per reaction/seriousness facet.

use super::fetch::{FetchRequest, Fetcher};
use super::{Collector, FacetSearch, Harvester, RawItem};
use crate::config::SourceConfig;
use crate::normalize::{self, NormalizeCtx, NormalizeError};
use crate::record::CanonicalRecord;
use crate::seen::SeenSet;
use anyhow::Result;
use async_trait::async_trait;

pub const SOURCE: &str = "adverse_events";

pub fn source_url(safety_report_id: &str) -> String {
    format!("https://fda.gov/adverse-event/{safety_report_id}")
}

pub struct AdverseEventHarvester {
    cfg: SourceConfig,
}

impl AdverseEventHarvester {
    pub fn new(cfg: SourceConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Harvester for AdverseEventHarvester {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn harvest(&self, fetcher: &dyn Fetcher, seen: &SeenSet) -> Result<Vec<RawItem>> {
        let search = FacetSearch {
            source: SOURCE,
            results_path: "results",
            id_path: "safetyreportid",
            cap: self.cfg.items_per_facet,
            delay: self.cfg.delay,
        };
        let mut collector = Collector::new(seen);

        for facet in &self.cfg.facets {
            let req = FetchRequest::new(&self.cfg.endpoint, self.cfg.timeout)
                .param("search", facet)
                .param("limit", self.cfg.page_size);
            search.run(fetcher, &mut collector, facet, &req, source_url).await;
        }
        Ok(collector.finish())
    }

    fn normalize(&self, item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
        normalize::adverse_events::normalize(item, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fetch::{FixtureFetcher, FixtureResponse};
    use serde_json::json;
    use std::time::Duration;

    fn cfg() -> SourceConfig {
        SourceConfig {
            endpoint: "https://api.test/event.json".into(),
            facets: vec!["serious:1".into(), "serious:2".into()],
            page_size: 5,
            items_per_facet: 2,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn caps_skips_and_dedups_across_facets() {
        let fetcher = FixtureFetcher::new()
            .route_query(
                "https://api.test/event.json",
                "search",
                "serious:1",
                FixtureResponse::Json(json!({"results": [
                    {"safetyreportid": "1"},
                    {"safetyreportid": "2"},
                    {"safetyreportid": "3"}
                ]})),
            )
            .route_query(
                "https://api.test/event.json",
                "search",
                "serious:2",
                FixtureResponse::Json(json!({"results": [
                    {"safetyreportid": "2"},
                    {"nothing": true},
                    {"safetyreportid": "9"}
                ]})),
            );
        let seen = SeenSet::from_persisted([source_url("1")].into_iter().collect());

        let items = AdverseEventHarvester::new(cfg()).harvest(&fetcher, &seen).await.unwrap();
        let urls: Vec<_> = items.iter().map(|i| i.source_url.as_str()).collect();

        // cap applies to raw entries: "3" and "9" are never looked at
        assert_eq!(urls, vec!["https://fda.gov/adverse-event/2"]);
        assert_eq!(
            fetcher.calls(),
            vec![
                "https://api.test/event.json?search=serious:1&limit=5",
                "https://api.test/event.json?search=serious:2&limit=5"
            ]
        );
    }

    #[tokio::test]
    async fn failing_facet_does_not_stop_the_rest() {
        let fetcher = FixtureFetcher::new()
            .route_query("https://api.test/event.json", "search", "serious:1", FixtureResponse::Status(500))
            .route_query(
                "https://api.test/event.json",
                "search",
                "serious:2",
                FixtureResponse::Json(json!({"results": [{"safetyreportid": "7"}]})),
            );
        let seen = SeenSet::default();
        let items = AdverseEventHarvester::new(cfg()).harvest(&fetcher, &seen).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].facet, "serious:2");
    }
}
