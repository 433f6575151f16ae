// src/harvest/device_recalls.rs
use super::fetch::{FetchRequest, Fetcher};
use super::{Collector, FacetSearch, Harvester, RawItem};
use crate::config::SourceConfig;
use crate::normalize::{self, NormalizeCtx, NormalizeError};
use crate::record::CanonicalRecord;
use crate::seen::SeenSet;
use anyhow::Result;
use async_trait::async_trait;

pub const SOURCE: &str = "device_recalls";

pub fn source_url(recall_number: &str) -> String {
    format!("https://www.fda.gov/medical-devices/medical-device-recalls/{recall_number}")
}

/// openFDA device recalls, one search per root-cause/classification facet.
pub struct DeviceRecallHarvester {
    cfg: SourceConfig,
}

impl DeviceRecallHarvester {
    pub fn new(cfg: SourceConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Harvester for DeviceRecallHarvester {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn harvest(&self, fetcher: &dyn Fetcher, seen: &SeenSet) -> Result<Vec<RawItem>> {
        let search = FacetSearch {
            source: SOURCE,
            results_path: "results",
            id_path: "recall_number",
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
        normalize::device_recalls::normalize(item, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fetch::{FixtureFetcher, FixtureResponse};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn not_found_facet_is_empty_and_urls_embed_recall_number() {
        let cfg = SourceConfig {
            endpoint: "https://api.test/recall.json".into(),
            facets: vec!["a".into(), "b".into()],
            page_size: 30,
            items_per_facet: 10,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
        };
        let fetcher = FixtureFetcher::new()
            .route_query("https://api.test/recall.json", "search", "a", FixtureResponse::Status(404))
            .route_query(
                "https://api.test/recall.json",
                "search",
                "b",
                FixtureResponse::Json(json!({"results": [
                    {"recall_number": "Z-0001-2025", "classification": "I"},
                    {"recall_number": "  "}
                ]})),
            );

        let items = DeviceRecallHarvester::new(cfg)
            .harvest(&fetcher, &SeenSet::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].source_url,
            "https://www.fda.gov/medical-devices/medical-device-recalls/Z-0001-2025"
        );
        assert_eq!(fetcher.calls().len(), 2);
    }
}
