// src/normalize/device_recalls.rs
use super::{parse_source_date, NormalizeCtx, NormalizeError};
use crate::extract::{extract_nonempty, extract_str};
use crate::harvest::RawItem;
use crate::record::{CanonicalRecord, RiskLevel};
use crate::text::clean_text;

/// Recall classification as published ("I", "Class II", "3", ...). Missing means class II.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallClass {
    I,
    II,
    III,
}

impl RecallClass {
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim().to_ascii_uppercase();
        let t = t.strip_prefix("CLASS").map(str::trim).unwrap_or(&t);
        match t {
            "I" | "1" => Some(Self::I),
            "II" | "2" => Some(Self::II),
            "III" | "3" => Some(Self::III),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
        }
    }

    pub fn risk(&self) -> RiskLevel {
        match self {
            Self::I => RiskLevel::Critical,
            Self::II => RiskLevel::High,
            Self::III => RiskLevel::Medium,
        }
    }
}

pub fn normalize(item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
    let recall = &item.payload;
    if extract_nonempty(recall, "recall_number", "").is_empty() {
        return Err(NormalizeError::MissingField("recall_number"));
    }

    let product = clean_text(
        &extract_nonempty(recall, "product_description", "Medical Device"),
        400,
    );
    let reason = clean_text(
        &extract_nonempty(recall, "reason_for_recall", "Safety concern"),
        500,
    );
    let root_cause = extract_nonempty(recall, "root_cause_description", "Device issue");
    let firm = extract_nonempty(recall, "recalling_firm", "Unknown Manufacturer");

    let raw_class = extract_nonempty(recall, "classification", "II");
    let (class_label, risk) = match RecallClass::parse(&raw_class) {
        Some(c) => (c.as_str().to_string(), c.risk()),
        None => (raw_class.clone(), RiskLevel::Medium),
    };

    let initiated = ["recall_initiation_date", "event_date_initiated"]
        .iter()
        .find_map(|p| parse_source_date(&extract_str(recall, p, "")))
        .unwrap_or(ctx.today);

    Ok(CanonicalRecord {
        device_name: crate::text::truncate_chars(&product, 100),
        old_warning: "Device approved for clinical use".into(),
        new_warning: format!("RECALL CLASS {class_label}: {reason}"),
        old_indication: product.clone(),
        new_indication: "Use discontinued - recall in effect".into(),
        recall_reason: reason.clone(),
        risk_level: risk,
        patient_population: "All device users".into(),
        contraindications: "Device use suspended per recall".into(),
        adverse_events: format!("Device-related: {root_cause}"),
        therapeutic_class: "Medical Device Recall".into(),
        manufacturer: firm,
        regulatory_status: format!("FDA Recall Class {class_label}"),
        clinical_significance: format!("Device recall: {root_cause}"),
        patient_safety_impact: format!("Class {class_label} recall - {reason}"),
        compliance_deadline: Some(ctx.days_from_today(30)),
        recall_class: class_label,
        ..CanonicalRecord::keyed(item.source_url.clone(), initiated)
    })
}
