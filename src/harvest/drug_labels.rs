// src/harvest/drug_labels.rs
//! DailyMed label search per drug, followed by a detail GET for each novel label.

use super::fetch::{FetchOutcome, FetchRequest, Fetcher};
use super::{count_duplicate, fetch_facet, log_fetch_error, skip_item, usable_id, Collector, Harvester, RawItem};
use crate::config::DrugLabelConfig;
use crate::extract::{extract_list, extract_nonempty};
use crate::normalize::{self, NormalizeCtx, NormalizeError};
use crate::record::CanonicalRecord;
use crate::seen::SeenSet;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

pub const SOURCE: &str = "drug_labels";

pub struct DrugLabelHarvester {
    cfg: DrugLabelConfig,
}

impl DrugLabelHarvester {
    pub fn new(cfg: DrugLabelConfig) -> Self {
        Self { cfg }
    }

    async fn harvest_drug(
        &self,
        fetcher: &dyn Fetcher,
        collector: &mut Collector<'_>,
        category: &str,
        drug: &str,
    ) {
        // 1) label search for this drug
        let req = FetchRequest::new(self.cfg.search_url(), self.cfg.timeout).param("drug_name", drug);
        let Some(body) = fetch_facet(fetcher, &req, SOURCE, drug, self.cfg.delay).await else {
            return;
        };

        for hit in extract_list(&body, "data").iter().take(self.cfg.items_per_facet) {
            let setid = extract_nonempty(hit, "setid", "");
            if !usable_id(&setid) {
                skip_item(SOURCE, drug, "missing setid");
                continue;
            }
            let detail_url = self.cfg.detail_url(&setid);
            if !collector.is_novel(&detail_url) {
                count_duplicate(SOURCE, &detail_url);
                continue;
            }

            // 2) label detail; without it the item is dropped
            let detail_req = FetchRequest::new(detail_url.as_str(), self.cfg.timeout);
            let detail = match fetcher.get_json(&detail_req).await {
                Ok(FetchOutcome::Json(v)) => v,
                Ok(FetchOutcome::NotFound) => {
                    skip_item(SOURCE, drug, "label detail not found");
                    continue;
                }
                Err(e) => {
                    log_fetch_error(SOURCE, drug, &e);
                    skip_item(SOURCE, drug, "label detail unavailable");
                    continue;
                }
            };

            collector.push(RawItem {
                source_url: detail_url,
                payload: json!({ "search": hit, "detail": detail }),
                facet: drug.to_string(),
                category: Some(category.to_string()),
            });
        }
    }
}

#[async_trait]
impl Harvester for DrugLabelHarvester {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn harvest(&self, fetcher: &dyn Fetcher, seen: &SeenSet) -> Result<Vec<RawItem>> {
        let mut collector = Collector::new(seen);
        for (category, drugs) in &self.cfg.categories {
            for drug in drugs {
                self.harvest_drug(fetcher, &mut collector, category, drug).await;
            }
        }
        Ok(collector.finish())
    }

    fn normalize(&self, item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
        normalize::drug_labels::normalize(item, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::fetch::{FixtureFetcher, FixtureResponse};
    use std::time::Duration;

    fn cfg() -> DrugLabelConfig {
        DrugLabelConfig {
            base_url: "https://dm.test/v2".into(),
            categories: vec![("high_risk_drugs".into(), vec!["warfarin".into(), "digoxin".into()])],
            items_per_facet: 3,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn detail_is_fetched_only_for_novel_labels() {
        let fetcher = FixtureFetcher::new()
            .route_query(
                "https://dm.test/v2/spls.json",
                "drug_name",
                "warfarin",
                FixtureResponse::Json(json!({"data": [
                    {"setid": "w1", "published_date": "Jan 02, 2024"},
                    {"setid": "w2"},
                    {"setid": "gone"},
                    {"setid": "w4"}
                ]})),
            )
            .route_query(
                "https://dm.test/v2/spls.json",
                "drug_name",
                "digoxin",
                FixtureResponse::Json(json!({"data": [{"setid": "w1"}, {"title": "no id"}]})),
            )
            .route("https://dm.test/v2/spls/w1.json", FixtureResponse::Json(json!({"labeler": "A"})))
            .route("https://dm.test/v2/spls/w2.json", FixtureResponse::Json(json!({})));
        let seen = SeenSet::from_persisted(["https://dm.test/v2/spls/w2.json".to_string()].into_iter().collect());

        let items = DrugLabelHarvester::new(cfg()).harvest(&fetcher, &seen).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_url, "https://dm.test/v2/spls/w1.json");
        assert_eq!(items[0].category.as_deref(), Some("high_risk_drugs"));
        assert_eq!(items[0].payload["detail"]["labeler"], "A");

        let calls = fetcher.calls();
        assert!(!calls.iter().any(|c| c.ends_with("/w2.json")));
        assert!(calls.iter().any(|c| c.ends_with("/gone.json")));
        assert!(!calls.iter().any(|c| c.ends_with("/w4.json")));
        assert_eq!(calls.iter().filter(|c| c.ends_with("/w1.json")).count(), 1);
    }
}
