// src/normalize/adverse_events.rs
use super::{guidance_for, join_nonempty, parse_source_date, NormalizeCtx, NormalizeError};
use crate::codes::patient_sex;
use crate::extract::{collect_field, extract_nonempty, extract_str};
use crate::harvest::RawItem;
use crate::record::{CanonicalRecord, RiskLevel};
use serde_json::Value;

/// serious=1 -> Critical, seriousnessother=1 -> High, otherwise Medium.
pub fn risk_level(report: &Value) -> RiskLevel {
    if extract_str(report, "serious", "0").trim() == "1" {
        RiskLevel::Critical
    } else if extract_str(report, "seriousnessother", "0").trim() == "1" {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn normalize(item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
    let report = &item.payload;
    if extract_nonempty(report, "safetyreportid", "").is_empty() {
        return Err(NormalizeError::MissingField("safetyreportid"));
    }

    let drug_name = extract_nonempty(report, "patient.drug.0.medicinalproduct", "Unknown Drug");
    let reactions = collect_field(report, "patient.reaction", "reactionmeddrapt", 3);
    let top_two = join_nonempty(&reactions[..reactions.len().min(2)]);

    let age = extract_nonempty(report, "patient.patientonsetage", "unknown");
    let sex = patient_sex(&extract_str(report, "patient.patientsex", ""));
    let risk = risk_level(report);
    let guidance = guidance_for(&drug_name);

    let update_date =
        parse_source_date(&extract_str(report, "receivedate", "")).unwrap_or(ctx.today);

    Ok(CanonicalRecord {
        drug_name: drug_name.clone(),
        condition: if reactions.is_empty() {
            "Adverse drug reaction".into()
        } else {
            join_nonempty(&reactions)
        },
        old_dosage: guidance
            .map(|g| g.old_dosage.to_string())
            .unwrap_or_else(|| "Standard dosing per label".into()),
        new_dosage: guidance
            .map(|g| g.new_dosage.to_string())
            .unwrap_or_else(|| "Dosing adjustment recommended based on adverse events".into()),
        old_warning: guidance
            .map(|g| g.old_warning.to_string())
            .unwrap_or_else(|| "Standard warnings".into()),
        new_warning: if top_two.is_empty() {
            "Enhanced monitoring for reported reactions".into()
        } else {
            format!("Enhanced monitoring for: {top_two}")
        },
        old_indication: "As approved".into(),
        new_indication: "Use with enhanced monitoring".into(),
        risk_level: risk,
        patient_population: format!("Patients similar to case: {sex}, age {age}"),
        contraindications: "Enhanced screening for risk factors".into(),
        adverse_events: join_nonempty(&reactions),
        mechanism_of_action: format!("{drug_name} mechanism with identified safety concern"),
        therapeutic_class: "Adverse Event Report".into(),
        manufacturer: extract_nonempty(report, "companynumb", "Unknown"),
        regulatory_status: "FDA Adverse Event Report".into(),
        clinical_significance: if top_two.is_empty() {
            "Adverse event pattern identified".into()
        } else {
            format!("Adverse event pattern identified: {top_two}")
        },
        patient_safety_impact: match risk {
            RiskLevel::Critical => "Serious adverse event - enhanced monitoring required".into(),
            RiskLevel::High => "Medically significant event - monitoring recommended".into(),
            RiskLevel::Medium => "Non-serious event - routine pharmacovigilance".into(),
        },
        compliance_deadline: Some(ctx.days_from_today(30)),
        adverse_event_count: reactions.len() as u32,
        ..CanonicalRecord::keyed(item.source_url.clone(), update_date)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ctx() -> NormalizeCtx {
        NormalizeCtx::new(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
    }

    fn item(payload: Value) -> RawItem {
        RawItem {
            source_url: "https://fda.gov/adverse-event/100".into(),
            payload,
            facet: "serious:1".into(),
            category: None,
        }
    }

    #[test]
    fn serious_report_is_critical_and_uses_guidance() {
        let rec = normalize(
            &item(json!({
                "safetyreportid": "100",
                "serious": "1",
                "receivedate": "20241201",
                "companynumb": "ACME-77",
                "patient": {
                    "patientsex": "2",
                    "patientonsetage": "81",
                    "drug": [{"medicinalproduct": "WARFARIN SODIUM"}],
                    "reaction": [
                        {"reactionmeddrapt": "Haemorrhage"},
                        {"reactionmeddrapt": "Anaemia"},
                        {"reactionmeddrapt": "Fall"},
                        {"reactionmeddrapt": "Confusion"}
                    ]
                }
            })),
            &ctx(),
        )
        .unwrap();

        assert_eq!(rec.risk_level, RiskLevel::Critical);
        assert_eq!(rec.drug_name, "WARFARIN SODIUM");
        assert_eq!(rec.old_dosage, "5mg daily");
        assert_eq!(rec.condition, "Haemorrhage, Anaemia, Fall");
        assert_eq!(rec.new_warning, "Enhanced monitoring for: Haemorrhage, Anaemia");
        assert_eq!(rec.patient_population, "Patients similar to case: Female, age 81");
        assert_eq!(rec.adverse_event_count, 3);
        assert_eq!(rec.update_date, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(rec.compliance_deadline, NaiveDate::from_ymd_opt(2025, 2, 9));
        assert_eq!(rec.manufacturer, "ACME-77");
    }

    #[test]
    fn sparse_report_falls_back_to_templates() {
        let rec = normalize(&item(json!({"safetyreportid": 100, "seriousnessother": 1})), &ctx()).unwrap();
        assert_eq!(rec.risk_level, RiskLevel::High);
        assert_eq!(rec.drug_name, "Unknown Drug");
        assert_eq!(rec.old_dosage, "Standard dosing per label");
        assert_eq!(rec.condition, "Adverse drug reaction");
        assert_eq!(rec.update_date, ctx().today);
        assert_eq!(rec.adverse_event_count, 0);
    }

    #[test]
    fn missing_report_id_is_rejected() {
        assert_eq!(
            normalize(&item(json!({"serious": "1"})), &ctx()),
            Err(NormalizeError::MissingField("safetyreportid"))
        );
    }
}
