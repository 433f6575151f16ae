// src/normalize/mod.rs
//! Record normalizers: pure mappings from one source payload to a [`CanonicalRecord`].
//!
//! The "old" vs "new" guidance fields are synthesized for fixture purposes from a small table of
//! well-known high-risk drugs, with templated text for everything else. They are not verified
//! regulatory content.
//!
//! Where a field has no upstream value and must still vary between records (label condition,
//! NDC code, approval date), it is derived from a SHA-256 of the source URL so the same payload
//! always normalizes to the same record.

pub mod adverse_events;
pub mod clinical_trials;
pub mod device_recalls;
pub mod drug_labels;

use crate::record::RiskLevel;
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy)]
pub struct NormalizeCtx {
    pub today: NaiveDate,
}

impl NormalizeCtx {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn days_from_today(&self, days: i64) -> NaiveDate {
        self.today + Duration::days(days)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Known dosing/warning changes for high-risk drugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guidance {
    pub drug: &'static str,
    pub old_dosage: &'static str,
    pub new_dosage: &'static str,
    pub old_warning: &'static str,
    pub new_warning: &'static str,
    pub risk: RiskLevel,
}

pub const GUIDANCE: &[Guidance] = &[
    Guidance {
        drug: "warfarin",
        old_dosage: "5mg daily",
        new_dosage: "2.5-5mg daily based on INR and age",
        old_warning: "Monitor INR regularly",
        new_warning: "BOXED WARNING: Increased bleeding risk. Weekly INR monitoring initially, especially elderly patients.",
        risk: RiskLevel::Critical,
    },
    Guidance {
        drug: "insulin",
        old_dosage: "Standard sliding scale",
        new_dosage: "Individualized dosing with CGM integration",
        old_warning: "Monitor blood glucose levels",
        new_warning: "Continuous glucose monitoring recommended for high-risk patients. Hypoglycemia prevention protocols.",
        risk: RiskLevel::High,
    },
    Guidance {
        drug: "digoxin",
        old_dosage: "0.25mg daily",
        new_dosage: "0.125mg daily (reduced for elderly and CKD)",
        old_warning: "Monitor for signs of toxicity",
        new_warning: "Serum level monitoring required in elderly and renally impaired patients; narrow therapeutic window.",
        risk: RiskLevel::High,
    },
    Guidance {
        drug: "metformin",
        old_dosage: "1000mg BID",
        new_dosage: "500mg BID (contraindicated if eGFR <30)",
        old_warning: "May cause lactic acidosis in rare cases",
        new_warning: "CONTRAINDICATED in severe renal impairment (eGFR <30). Enhanced lactic acidosis monitoring.",
        risk: RiskLevel::High,
    },
];

/// Case-insensitive substring match, so "WARFARIN SODIUM" resolves to warfarin.
pub fn guidance_for(name: &str) -> Option<&'static Guidance> {
    let n = name.to_ascii_lowercase();
    GUIDANCE.iter().find(|g| n.contains(g.drug))
}

/// Stable index in `0..n` derived from `seed` and a `salt` (distinct salts give independent picks).
pub fn stable_pick(seed: &str, salt: &str, n: usize) -> usize {
    use sha2::{Digest, Sha256};
    if n == 0 {
        return 0;
    }
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(word) % n as u64) as usize
}

/// Stable integer in `lo..=hi`.
pub fn stable_range(seed: &str, salt: &str, lo: u32, hi: u32) -> u32 {
    let span = (hi.saturating_sub(lo) as usize) + 1;
    lo + stable_pick(seed, salt, span) as u32
}

/// Parse `YYYYMMDD` (openFDA) or `YYYY-MM-DD`; anything else is `None`.
pub fn parse_source_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Join with ", " after dropping blanks.
pub(crate) fn join_nonempty<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_matches_salt_forms() {
        assert_eq!(guidance_for("WARFARIN SODIUM").map(|g| g.drug), Some("warfarin"));
        assert_eq!(guidance_for("Metformin HCl").map(|g| g.drug), Some("metformin"));
        assert!(guidance_for("sertraline").is_none());
    }

    #[test]
    fn stable_picks_are_deterministic_and_bounded() {
        let a = stable_pick("https://x/1", "condition", 5);
        assert_eq!(a, stable_pick("https://x/1", "condition", 5));
        assert!(a < 5);
        let r = stable_range("https://x/1", "deadline", 14, 60);
        assert!((14..=60).contains(&r));
        assert_eq!(stable_pick("s", "t", 0), 0);
    }

    #[test]
    fn source_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_source_date("20240229"), Some(d));
        assert_eq!(parse_source_date("2024-02-29"), Some(d));
        assert_eq!(parse_source_date("Feb 2024"), None);
    }
}
