// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod codes;
pub mod config;
pub mod demo;
pub mod extract;
pub mod record;
pub mod seen;
pub mod text;

// Harvest pipeline
pub mod harvest;
pub mod normalize;
pub mod orchestrator;

// Downstream tooling over harvested datasets
pub mod corpus;
pub mod events;
pub mod load;

// ---- Re-exports for stable public API ----
pub use crate::orchestrator::{HarvestError, HarvestReport, Orchestrator};
pub use crate::record::{CanonicalRecord, RiskLevel, FIELDNAMES};
pub use crate::seen::SeenSet;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` filters (default `clinical_ground_truth=info,warn`);
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clinical_ground_truth=info,harvest=info,corpus=info,load=info,events=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    // Already installed (tests, embedding apps) is fine.
    let _ = res;
}
