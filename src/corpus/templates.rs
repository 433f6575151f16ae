// src/corpus/templates.rs
//! Plain-text renderings of the clinical document templates.
//!
//! Bodies quote only the superseded (`old_*`) guidance plus neutral context fields, never the
//! `new_*` values; that gap is what makes a generated document stale.

use crate::record::CanonicalRecord;
use chrono::{Duration, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Template {
    MedicationProtocol,
    DeviceManual,
    ClinicalGuideline,
    FormularyEntry,
    TrainingMemo,
    SafetyAlert,
    ResearchSummary,
    NursingProtocol,
}

impl Template {
    pub const ALL: [Template; 8] = [
        Template::MedicationProtocol,
        Template::DeviceManual,
        Template::ClinicalGuideline,
        Template::FormularyEntry,
        Template::TrainingMemo,
        Template::SafetyAlert,
        Template::ResearchSummary,
        Template::NursingProtocol,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Template::MedicationProtocol => "medication_protocol",
            Template::DeviceManual => "device_manual",
            Template::ClinicalGuideline => "clinical_guideline",
            Template::FormularyEntry => "formulary_entry",
            Template::TrainingMemo => "training_memo",
            Template::SafetyAlert => "safety_alert",
            Template::ResearchSummary => "research_summary",
            Template::NursingProtocol => "nursing_protocol",
        }
    }

    /// Candidates for a record: device recall -> manual; drug -> protocol/formulary/memo;
    /// condition -> guideline/nursing/research; anything else -> alert/memo.
    pub fn candidates(rec: &CanonicalRecord) -> &'static [Template] {
        if present(&rec.device_name) && present(&rec.recall_reason) {
            &[Template::DeviceManual]
        } else if present(&rec.drug_name) {
            &[Template::MedicationProtocol, Template::FormularyEntry, Template::TrainingMemo]
        } else if present(&rec.condition) {
            &[Template::ClinicalGuideline, Template::NursingProtocol, Template::ResearchSummary]
        } else {
            &[Template::SafetyAlert, Template::TrainingMemo]
        }
    }

    pub fn choose<R: Rng + ?Sized>(rec: &CanonicalRecord, rng: &mut R) -> Template {
        *Self::candidates(rec)
            .choose(rng)
            .unwrap_or(&Template::TrainingMemo)
    }

    pub fn title(&self, rec: &CanonicalRecord) -> String {
        match self {
            Template::MedicationProtocol => {
                format!("Medication Administration Protocol: {}", or(&rec.drug_name, "Medication"))
            }
            Template::DeviceManual => format!("Operating Manual: {}", or(&rec.device_name, "Medical Device")),
            Template::ClinicalGuideline => format!(
                "Clinical Practice Guideline: Management of {}",
                or(&rec.condition, "Medical Condition")
            ),
            Template::FormularyEntry => format!("Hospital Formulary Entry: {}", or(&rec.drug_name, "Medication")),
            Template::TrainingMemo => format!(
                "Clinical Training Update: {}",
                rec.subject().unwrap_or("Clinical Update")
            ),
            Template::SafetyAlert => format!(
                "Patient Safety Alert: {}",
                first_present(&[&rec.drug_name, &rec.device_name]).unwrap_or("Clinical Safety Issue")
            ),
            Template::ResearchSummary => format!(
                "Clinical Research Summary: {}",
                first_present(&[&rec.condition, &rec.drug_name]).unwrap_or("Clinical Research")
            ),
            Template::NursingProtocol => format!(
                "Nursing Care Protocol: {}",
                first_present(&[&rec.drug_name, &rec.condition]).unwrap_or("Patient Care")
            ),
        }
    }

    /// Full document text for `rec`, dated `doc_date`.
    pub fn render<R: Rng + ?Sized>(&self, rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
        let title = self.title(rec);
        let mut out = format!("{title}\n{}\n\n", "=".repeat(title.chars().count()));
        let body = match self {
            Template::MedicationProtocol | Template::FormularyEntry => medication(self, rec, doc_date, rng),
            Template::DeviceManual => device_manual(rec, rng),
            Template::ClinicalGuideline => guideline(rec, doc_date, rng),
            Template::TrainingMemo => training_memo(rec, doc_date, rng),
            Template::SafetyAlert => safety_alert(rec, doc_date, rng),
            Template::ResearchSummary => research_summary(rec, doc_date, rng),
            Template::NursingProtocol => nursing(rec, doc_date, rng),
        };
        out.push_str(&body);
        out
    }
}

fn present(s: &str) -> bool {
    !s.trim().is_empty()
}

fn or<'a>(s: &'a str, default: &'a str) -> &'a str {
    if present(s) {
        s
    } else {
        default
    }
}

fn first_present<'a>(fields: &[&'a String]) -> Option<&'a str> {
    fields.iter().map(|s| s.as_str()).find(|s| present(s))
}

fn date_or(d: Option<NaiveDate>, default: &str) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| default.to_string())
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or("")
}

fn months_before<R: Rng + ?Sized>(rng: &mut R, date: NaiveDate, lo: i64, hi: i64) -> String {
    (date - Duration::days(rng.random_range(lo..=hi))).format("%B %Y").to_string()
}

fn medication<R: Rng + ?Sized>(t: &Template, rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let drug = or(&rec.drug_name, "Medication");
    let prefix = if *t == Template::FormularyEntry { "FORM" } else { "MED-PROT" };
    let warning = or(&rec.old_warning, "Standard monitoring protocols apply");
    let mut s = String::new();

    let _ = writeln!(s, "DOCUMENT CONTROL INFORMATION");
    let _ = writeln!(s, "Document ID:       {prefix}-{}", rng.random_range(1000..=9999));
    let _ = writeln!(s, "Effective Date:    {}", date_or(rec.fda_approval_date, &doc_date.to_string()));
    let _ = writeln!(s, "Review Date:       {}", date_or(rec.compliance_deadline, ""));
    let _ = writeln!(s, "Therapeutic Class: {}", or(&rec.therapeutic_class, "Not specified"));
    let _ = writeln!(s, "Risk Level:        {}\n", rec.risk_level);

    let _ = writeln!(s, "STANDARD DOSING PROTOCOL");
    let _ = writeln!(
        s,
        "Current Standard Dose: {}",
        or(&rec.old_dosage, "Standard dosing as per manufacturer guidelines")
    );
    let _ = writeln!(s, "Monitoring Requirements: {warning}\n");

    let _ = writeln!(s, "ADMINISTRATION GUIDELINES");
    let _ = writeln!(s, "Route of Administration: {}", pick(rng, &["Oral", "IV", "IM", "Subcutaneous"]));
    let _ = writeln!(
        s,
        "Frequency: {}",
        pick(rng, &["Once daily", "Twice daily", "Three times daily", "As needed"])
    );
    let _ = writeln!(s, "Duration: {}", pick(rng, &["7 days", "14 days", "30 days", "Until discontinued"]));
    let _ = writeln!(
        s,
        "Patient Population: {}\n",
        or(&rec.patient_population, "Adult patients 18+ years")
    );

    let _ = writeln!(s, "CONTRAINDICATIONS AND PRECAUTIONS");
    let _ = writeln!(s, "Contraindications: {}", or(&rec.contraindications, "Standard contraindications apply"));
    let _ = writeln!(s, "Adverse Events: {}\n", or(&rec.adverse_events, "Monitor for standard adverse effects"));

    let _ = writeln!(s, "PATIENT MONITORING PROTOCOL");
    let _ = writeln!(
        s,
        "Regular monitoring is essential for safe administration of {drug}. Current protocols \
         require: {warning}. Baseline laboratory values should be obtained prior to initiation."
    );
    let _ = writeln!(
        s,
        "The mechanism of action involves {}. Clinical efficacy has been demonstrated in {}.\n",
        or(&rec.mechanism_of_action, "complex pharmacological pathways"),
        or(&rec.condition, "appropriate patient populations")
    );

    let _ = writeln!(s, "SPECIAL POPULATIONS");
    let _ = writeln!(s, "Elderly Patients: Dose adjustment may be required based on renal function.");
    let _ = writeln!(s, "Pediatric Patients: Safety and efficacy not established under 18 years.");
    let _ = writeln!(s, "Pregnancy: Use only if potential benefit justifies potential risk to fetus.\n");
    let _ = writeln!(s, "Last revised: {}", months_before(rng, doc_date, 180, 730));
    s
}

fn device_manual<R: Rng + ?Sized>(rec: &CanonicalRecord, rng: &mut R) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "DEVICE INFORMATION");
    let _ = writeln!(s, "Model Number:   MDL-{}", rng.random_range(1000..=9999));
    let _ = writeln!(s, "Manufacturer:   {}", or(&rec.manufacturer, "Medical Device Corp"));
    let _ = writeln!(s, "FDA Status:     {}", or(&rec.regulatory_status, "FDA Cleared"));
    let _ = writeln!(s, "Classification: Class II Medical Device");
    let _ = writeln!(
        s,
        "Manual Version: v{}.{}\n",
        rng.random_range(1..=5),
        rng.random_range(0..=9)
    );

    let _ = writeln!(s, "OPERATING INSTRUCTIONS");
    let _ = writeln!(
        s,
        "Current Operating Protocol: {}\n",
        or(&rec.old_warning, "Standard operating procedures apply")
    );

    let _ = writeln!(s, "SAFETY INFORMATION");
    let _ = writeln!(s, "WARNING: This device should only be operated by trained medical personnel.");
    let _ = writeln!(s, "Indications for Use: {}", or(&rec.old_indication, "As indicated in original labeling"));
    let _ = writeln!(s, "Contraindications: {}\n", or(&rec.contraindications, "Standard contraindications apply"));

    let _ = writeln!(s, "MAINTENANCE AND CALIBRATION");
    let _ = writeln!(s, "Calibration Schedule: {}", pick(rng, &["Daily", "Weekly", "Monthly", "Quarterly"]));
    let _ = writeln!(
        s,
        "Preventive Maintenance: {}",
        pick(rng, &["Monthly", "Quarterly", "Semi-annually", "Annually"])
    );
    s
}

fn guideline<R: Rng + ?Sized>(rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let condition = or(&rec.condition, "Medical Condition");
    let mut s = String::new();
    let _ = writeln!(s, "Condition: {condition}");
    let _ = writeln!(s, "Target Population: {}", or(&rec.patient_population, "Adult patients"));
    let _ = writeln!(s, "Evidence Level: {}", pick(rng, &["Grade A", "Grade B", "Grade C"]));
    let _ = writeln!(s, "Last Updated: {}\n", months_before(rng, doc_date, 365, 1095));

    let _ = writeln!(s, "TREATMENT RECOMMENDATIONS");
    if present(&rec.drug_name) {
        let _ = writeln!(s, "First-line Therapy: {}", rec.drug_name);
        let _ = writeln!(s, "Recommended Dosing: {}", or(&rec.old_dosage, "As per manufacturer guidelines"));
        let _ = writeln!(s, "Monitoring: {}", or(&rec.old_warning, "Standard monitoring applies"));
    }
    let _ = writeln!(s);

    let _ = writeln!(s, "CLINICAL EVIDENCE SUMMARY");
    let _ = writeln!(
        s,
        "Current evidence supports established treatment protocols for {condition}. Clinical trials \
         have demonstrated efficacy with {}.",
        or(&rec.old_indication, "standard therapeutic approaches")
    );
    let _ = writeln!(
        s,
        "Contraindications include {}. Clinicians should monitor for {}.\n",
        or(&rec.contraindications, "standard contraindications"),
        or(&rec.adverse_events, "expected adverse effects")
    );

    let _ = writeln!(s, "THERAPEUTIC MONITORING");
    let _ = writeln!(
        s,
        "Current protocols recommend {}.",
        or(&rec.old_warning, "standard monitoring intervals")
    );
    for line in ["Treatment efficacy", "Adverse effects", "Disease progression", "Need for therapy modification"] {
        let _ = writeln!(s, "  - {line}");
    }
    s
}

fn training_memo<R: Rng + ?Sized>(rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let topic = rec.subject().unwrap_or("Clinical Update");
    let mut s = String::new();
    let _ = writeln!(s, "TO: All Clinical Staff");
    let _ = writeln!(s, "FROM: Medical Education Department");
    let _ = writeln!(s, "DATE: {}", doc_date.format("%B %d, %Y"));
    let _ = writeln!(s, "SUBJECT: Important Clinical Update - {topic}\n");

    let _ = writeln!(s, "CURRENT PROTOCOLS:");
    if present(&rec.old_dosage) {
        let _ = writeln!(s, "  - Current dosing guidelines: {}", rec.old_dosage);
    }
    if present(&rec.old_warning) {
        let _ = writeln!(s, "  - Monitoring requirements: {}", rec.old_warning);
    }
    if present(&rec.old_indication) {
        let _ = writeln!(s, "  - Indications for use: {}", rec.old_indication);
    }

    let _ = writeln!(s, "\nCLINICAL CONSIDERATIONS:");
    let _ = writeln!(s, "Patient population affected: {}", or(&rec.patient_population, "Adult patients"));
    let _ = writeln!(s, "Risk level: {}", rec.risk_level);
    let _ = writeln!(s, "Contraindications: {}", or(&rec.contraindications, "Standard contraindications apply"));
    let _ = writeln!(
        s,
        "\nADVERSE EVENTS TO MONITOR:\n{}",
        or(&rec.adverse_events, "Standard adverse event monitoring protocols apply")
    );
    let _ = writeln!(
        s,
        "\nTHERAPEUTIC CLASS:\n{}",
        or(&rec.therapeutic_class, "As previously classified")
    );

    let _ = writeln!(s, "\n---\nMedical Education Department");
    let _ = writeln!(s, "Document ID: MED-{}", rng.random_range(1000..=9999));
    let _ = writeln!(s, "Revision Date: {}", months_before(rng, doc_date, 90, 365));
    s
}

fn safety_alert<R: Rng + ?Sized>(rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let item = first_present(&[&rec.drug_name, &rec.device_name]).unwrap_or("Clinical Safety Issue");
    let mut s = String::new();
    let _ = writeln!(s, "PATIENT SAFETY ALERT");
    let _ = writeln!(s, "Alert Level: {}", rec.risk_level);
    let _ = writeln!(s, "Date Issued: {}", doc_date.format("%B %d, %Y"));
    let _ = writeln!(s, "Alert ID: PSA-{}\n", rng.random_range(1000..=9999));
    let _ = writeln!(s, "AFFECTED ITEM: {item}");
    let _ = writeln!(s, "MANUFACTURER: {}\n", or(&rec.manufacturer, "Various manufacturers"));

    let _ = writeln!(s, "CURRENT PROTOCOLS:");
    let _ = writeln!(s, "  - Dosing: {}", or(&rec.old_dosage, "Current dosing protocols"));
    let _ = writeln!(s, "  - Monitoring: {}", or(&rec.old_warning, "Current monitoring protocols"));
    let _ = writeln!(s, "  - Indications: {}\n", or(&rec.old_indication, "Current indications"));

    let _ = writeln!(s, "PATIENT POPULATIONS:\n{}", or(&rec.patient_population, "All patients receiving this therapy"));
    let _ = writeln!(s, "\nCONTRAINDICATIONS:\n{}", or(&rec.contraindications, "Review all contraindications"));
    let _ = writeln!(s, "\nREGULATORY STATUS:\n{}", or(&rec.regulatory_status, "Under review"));
    let _ = writeln!(s, "\n---\nPatient Safety Department");
    s
}

fn research_summary<R: Rng + ?Sized>(rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let topic = first_present(&[&rec.condition, &rec.drug_name]).unwrap_or("Clinical Research");
    let mut s = String::new();
    let _ = writeln!(s, "Research Topic: {topic}");
    let _ = writeln!(s, "Date Compiled: {}", doc_date.format("%B %d, %Y"));
    let _ = writeln!(s, "Summary ID: CRS-{}\n", rng.random_range(1000..=9999));

    let _ = writeln!(s, "KEY FINDINGS:");
    if present(&rec.clinical_trial_id) {
        let _ = writeln!(s, "  - Clinical trial {} provides supporting evidence", rec.clinical_trial_id);
    }
    let _ = writeln!(s, "  - Mechanism of action: {}", or(&rec.mechanism_of_action, "As currently understood"));
    let _ = writeln!(s, "  - Therapeutic class: {}", or(&rec.therapeutic_class, "Standard classification"));
    let _ = writeln!(s, "  - Patient population: {}\n", or(&rec.patient_population, "Study populations"));

    let _ = writeln!(s, "CLINICAL IMPLICATIONS:");
    let _ = writeln!(s, "  - Dosing: {}", or(&rec.old_dosage, "Standard dosing approaches"));
    let _ = writeln!(s, "  - Monitoring: {}", or(&rec.old_warning, "Established monitoring protocols"));
    let _ = writeln!(s, "  - Indications: {}\n", or(&rec.old_indication, "Current approved indications"));

    let _ = writeln!(s, "SAFETY PROFILE:");
    let _ = writeln!(s, "Contraindications: {}", or(&rec.contraindications, "Standard contraindications"));
    let _ = writeln!(s, "Adverse events: {}", or(&rec.adverse_events, "Expected adverse event profile"));
    let _ = writeln!(s, "Approval Date: {}", date_or(rec.fda_approval_date, "Historical approval"));
    let _ = writeln!(s, "\n---\nClinical Research Department");
    let _ = writeln!(s, "Last updated: {}", months_before(rng, doc_date, 60, 300));
    s
}

fn nursing<R: Rng + ?Sized>(rec: &CanonicalRecord, doc_date: NaiveDate, rng: &mut R) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Protocol ID:        NP-{}", rng.random_range(1000..=9999));
    let _ = writeln!(s, "Effective Date:     {}", rec.update_date.min(doc_date));
    let _ = writeln!(s, "Risk Level:         {}", rec.risk_level);
    let _ = writeln!(s, "Patient Population: {}\n", or(&rec.patient_population, "Adult patients"));

    let _ = writeln!(s, "CARE INSTRUCTIONS");
    if present(&rec.drug_name) {
        let _ = writeln!(s, "  - Drug: {}", rec.drug_name);
        let _ = writeln!(s, "  - Dosage: {}", or(&rec.old_dosage, "As ordered by physician"));
        let _ = writeln!(s, "  - Route: {}", pick(rng, &["PO", "IV", "IM", "SQ"]));
        let _ = writeln!(s, "  - Frequency: {}", pick(rng, &["QD", "BID", "TID", "QID", "PRN"]));
    } else {
        let _ = writeln!(s, "  - Condition: {}", or(&rec.condition, "As diagnosed"));
        let _ = writeln!(s, "  - Care level: {}", rec.risk_level);
    }

    let _ = writeln!(s, "\nMONITORING AND ASSESSMENT");
    let _ = writeln!(s, "Required Monitoring: {}", or(&rec.old_warning, "Standard monitoring protocols"));
    let _ = writeln!(s, "Assessment Frequency: {}", pick(rng, &["Q4H", "Q8H", "Q12H", "Daily", "PRN"]));
    let _ = writeln!(s, "\nSAFETY CONSIDERATIONS");
    let _ = writeln!(s, "Contraindications: {}", or(&rec.contraindications, "Standard contraindications"));
    let _ = writeln!(s, "Adverse Events to Monitor: {}", or(&rec.adverse_events, "Standard adverse events"));
    s
}
