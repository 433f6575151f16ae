// src/demo.rs
//! Hand-authored scenarios appended when a run harvests too little to be useful downstream.

use crate::record::{CanonicalRecord, RiskLevel};
use chrono::{Duration, NaiveDate};

pub const DEMO_URL_PREFIX: &str = "https://clinical-guardian-demo.com/scenario/";

struct Scenario {
    drug_name: &'static str,
    device_name: &'static str,
    condition: &'static str,
    old_dosage: &'static str,
    new_dosage: &'static str,
    old_warning: &'static str,
    new_warning: &'static str,
    recall_reason: &'static str,
    recall_class: &'static str,
    risk_level: RiskLevel,
    clinical_significance: &'static str,
    patient_safety_impact: &'static str,
    adverse_event_count: u32,
}

const SCENARIOS: [Scenario; 4] = [
    Scenario {
        drug_name: "warfarin",
        device_name: "",
        condition: "atrial fibrillation",
        old_dosage: "5mg daily standard dosing",
        new_dosage: "2.5mg daily for patients >75 years (age-adjusted)",
        old_warning: "Monitor INR monthly",
        new_warning: "BOXED WARNING: Weekly INR monitoring required for elderly patients.",
        recall_reason: "",
        recall_class: "",
        risk_level: RiskLevel::Critical,
        clinical_significance: "Age-adjusted dosing reduces major bleeding events by 40% in elderly patients",
        patient_safety_impact: "Critical - immediate dosing protocol revision required",
        adverse_event_count: 156,
    },
    Scenario {
        drug_name: "insulin",
        device_name: "",
        condition: "diabetes mellitus",
        old_dosage: "Standard sliding scale insulin protocol",
        new_dosage: "Weight-based dosing with continuous glucose monitor integration",
        old_warning: "Monitor blood glucose every 6 hours",
        new_warning: "Continuous monitoring required for high-risk patients.",
        recall_reason: "",
        recall_class: "",
        risk_level: RiskLevel::High,
        clinical_significance: "CGM integration reduces hypoglycemic events by 35%",
        patient_safety_impact: "High - updated monitoring protocols required",
        adverse_event_count: 89,
    },
    Scenario {
        drug_name: "",
        device_name: "Volumetric infusion pump",
        condition: "",
        old_dosage: "",
        new_dosage: "",
        old_warning: "Verify programmed rate before infusion start",
        new_warning: "RECALL CLASS I: Software fault may deliver free-flow infusion. Remove affected units from service.",
        recall_reason: "Software fault may cause unintended free-flow infusion",
        recall_class: "I",
        risk_level: RiskLevel::Critical,
        clinical_significance: "Free-flow events associated with overdose of high-alert medications",
        patient_safety_impact: "Critical - remove affected pumps and switch to alternate devices",
        adverse_event_count: 42,
    },
    Scenario {
        drug_name: "metformin",
        device_name: "",
        condition: "type 2 diabetes",
        old_dosage: "1000mg twice daily",
        new_dosage: "500mg twice daily; contraindicated if eGFR <30",
        old_warning: "May cause lactic acidosis in rare cases",
        new_warning: "CONTRAINDICATED in severe renal impairment (eGFR <30). Check renal function before initiation.",
        recall_reason: "",
        recall_class: "",
        risk_level: RiskLevel::High,
        clinical_significance: "Renal-function gating prevents lactic acidosis in CKD patients",
        patient_safety_impact: "High - renal screening required before prescribing",
        adverse_event_count: 64,
    },
];

/// Number of scenarios `scenarios` returns.
pub const SCENARIO_COUNT: usize = SCENARIOS.len();

pub fn source_url(index: usize) -> String {
    format!("{DEMO_URL_PREFIX}{}", index + 1)
}

/// All scenarios dated against `today`, with URLs `.../scenario/1..=4`.
pub fn scenarios(today: NaiveDate) -> Vec<CanonicalRecord> {
    SCENARIOS
        .iter()
        .enumerate()
        .map(|(i, s)| CanonicalRecord {
            drug_name: s.drug_name.into(),
            device_name: s.device_name.into(),
            condition: if s.condition.is_empty() {
                "clinical condition".into()
            } else {
                s.condition.into()
            },
            old_dosage: s.old_dosage.into(),
            new_dosage: s.new_dosage.into(),
            old_warning: s.old_warning.into(),
            new_warning: s.new_warning.into(),
            old_indication: "Previous indication per labeling".into(),
            new_indication: "Updated indication based on new safety data".into(),
            recall_reason: s.recall_reason.into(),
            risk_level: s.risk_level,
            fda_approval_date: Some(today - Duration::days(365)),
            ndc_code: format!("{}-123-45", 10000 + i),
            patient_population: "Adult patients in acute care settings".into(),
            contraindications: "Standard contraindications apply".into(),
            adverse_events: "Enhanced monitoring for adverse effects".into(),
            mechanism_of_action: "Updated mechanism with safety considerations".into(),
            therapeutic_class: "High-Priority Clinical Update".into(),
            manufacturer: format!("Demo Pharma {}", i + 1),
            regulatory_status: "FDA Safety Update".into(),
            clinical_significance: s.clinical_significance.into(),
            patient_safety_impact: s.patient_safety_impact.into(),
            compliance_deadline: Some(today + Duration::days(30)),
            adverse_event_count: s.adverse_event_count,
            recall_class: s.recall_class.into(),
            ..CanonicalRecord::keyed(source_url(i), today)
        })
        .collect()
}
