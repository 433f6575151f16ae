// src/normalize/clinical_trials.rs
use super::{NormalizeCtx, NormalizeError};
use crate::extract::{collect_field, extract_nonempty, extract_u64, join_list};
use crate::harvest::RawItem;
use crate::record::{CanonicalRecord, RiskLevel};
use crate::text::truncate_chars;

const HALTED: [&str; 3] = ["TERMINATED", "SUSPENDED", "WITHDRAWN"];

pub fn risk_level(overall_status: &str) -> RiskLevel {
    if HALTED.contains(&overall_status.trim().to_ascii_uppercase().as_str()) {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn normalize(item: &RawItem, ctx: &NormalizeCtx) -> Result<CanonicalRecord, NormalizeError> {
    let study = &item.payload;
    let nct_id = extract_nonempty(study, "protocolSection.identificationModule.nctId", "");
    if nct_id.is_empty() {
        return Err(NormalizeError::MissingField("nctId"));
    }

    let title = extract_nonempty(study, "protocolSection.identificationModule.briefTitle", &nct_id);
    let status = extract_nonempty(study, "protocolSection.statusModule.overallStatus", "");
    let conditions = join_list(study, "protocolSection.conditionsModule.conditions", ", ");
    let interventions = collect_field(
        study,
        "protocolSection.armsInterventionsModule.interventions",
        "name",
        3,
    );
    let phases = join_list(study, "protocolSection.designModule.phases", ", ");
    let enrollment = extract_u64(study, "protocolSection.designModule.enrollmentInfo.count", 0);

    Ok(CanonicalRecord {
        drug_name: interventions.join(", "),
        condition: truncate_chars(&conditions, 100),
        old_dosage: "Study protocol dosing".into(),
        new_dosage: "Updated protocol based on interim results".into(),
        old_warning: "Standard study precautions".into(),
        new_warning: "Enhanced safety monitoring based on trial data".into(),
        old_indication: "Investigational use".into(),
        new_indication: format!("Clinical trial evidence for {conditions}"),
        risk_level: risk_level(&status),
        clinical_trial_id: nct_id,
        patient_population: format!("Clinical trial participants (n={enrollment})"),
        contraindications: "Per trial protocol".into(),
        adverse_events: "As reported in trial monitoring".into(),
        mechanism_of_action: "Under clinical investigation".into(),
        therapeutic_class: "Clinical Trial".into(),
        manufacturer: extract_nonempty(
            study,
            "protocolSection.sponsorCollaboratorsModule.leadSponsor.name",
            "Trial Sponsor",
        ),
        regulatory_status: status.clone(),
        clinical_significance: format!("Clinical trial evidence: {title}"),
        patient_safety_impact: "Clinical trial safety monitoring".into(),
        compliance_deadline: Some(ctx.days_from_today(90)),
        trial_phase: phases,
        study_status: status,
        ..CanonicalRecord::keyed(item.source_url.clone(), ctx.today)
    })
}
