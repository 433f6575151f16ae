// src/codes.rs
//! openFDA drug-event code tables.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Qualification,
    Outcome,
    ReportType,
    ActionDrug,
    DrugCharacterization,
}

/// Human-readable label for an openFDA code; `"Unknown"` for anything unlisted.
pub fn translate(kind: CodeKind, code: &str) -> &'static str {
    match (kind, code.trim()) {
        (CodeKind::Qualification, "1") => "Physician",
        (CodeKind::Qualification, "2") => "Pharmacist",
        (CodeKind::Qualification, "3") => "Other Health Professional",
        (CodeKind::Qualification, "4") => "Lawyer",
        (CodeKind::Qualification, "5") => "Consumer or Non-Health Professional",

        (CodeKind::Outcome, "1") => "Recovered/Resolved",
        (CodeKind::Outcome, "2") => "Recovering/Resolving",
        (CodeKind::Outcome, "3") => "Not Recovered/Not Resolved",
        (CodeKind::Outcome, "4") => "Recovered/Resolved with Sequelae",
        (CodeKind::Outcome, "5") => "Fatal",
        (CodeKind::Outcome, "6") => "Unknown",

        (CodeKind::ReportType, "1") => "Spontaneous",
        (CodeKind::ReportType, "2") => "Report from study",
        (CodeKind::ReportType, "3") => "Other",
        (CodeKind::ReportType, "4") => "Not available to sender",

        (CodeKind::ActionDrug, "1") => "Drug withdrawn",
        (CodeKind::ActionDrug, "2") => "Dose reduced",
        (CodeKind::ActionDrug, "3") => "Dose increased",
        (CodeKind::ActionDrug, "4") => "Dose not changed",
        (CodeKind::ActionDrug, "5") => "Unknown",
        (CodeKind::ActionDrug, "6") => "Not applicable",

        (CodeKind::DrugCharacterization, "1") => "Suspect",
        (CodeKind::DrugCharacterization, "2") => "Concomitant",
        (CodeKind::DrugCharacterization, "3") => "Interacting",

        _ => "Unknown",
    }
}

/// `patient.patientsex`: 1 male, 2 female.
pub fn patient_sex(code: &str) -> &'static str {
    match code.trim() {
        "1" => "Male",
        "2" => "Female",
        _ => "Unknown",
    }
}
