// src/events.rs
//! openFDA drug-event dump -> flat CSV, one row per report.
//!
//! Dumps run to gigabytes, so the top-level `results` array is walked with a `DeserializeSeed`
//! and only one report is held in memory at a time.

use crate::codes::{patient_sex, translate, CodeKind};
use crate::extract::{extract_list, extract_str};
use anyhow::{Context, Result};
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const EVENT_COLUMNS: [&str; 18] = [
    "safetyreportid",
    "receivedate",
    "serious",
    "reporttype",
    "fulfillexpeditecriteria",
    "occurcountry",
    "reporter_qualification",
    "patientonsetage",
    "patientsex",
    "medicinalproduct",
    "brand_name",
    "manufacturer_name",
    "drugcharacterization",
    "action_taken_with_drug",
    "drugindication",
    "drugdosagetext",
    "reactions",
    "reaction_outcomes",
];

/// Flatten one report. The first listed drug is treated as the primary one.
pub fn report_row(report: &Value) -> Vec<String> {
    let s = |path: &str| extract_str(report, path, "");
    let coded = |kind, path: &str| translate(kind, &s(path)).to_string();

    let expedited = if s("fulfillexpeditecriteria").trim() == "1" { "Yes" } else { "No" };
    let sex = patient_sex(&s("patient.patientsex"));

    let (product, brand, maker, characterization, action, indication, dosage) =
        match extract_list(report, "patient.drug").first() {
            Some(drug) => {
                let d = |path: &str| extract_str(drug, path, "");
                (
                    d("medicinalproduct"),
                    d("openfda.brand_name.0"),
                    d("openfda.manufacturer_name.0"),
                    translate(CodeKind::DrugCharacterization, &d("drugcharacterization")).to_string(),
                    translate(CodeKind::ActionDrug, &d("actiondrug")).to_string(),
                    d("drugindication"),
                    d("drugdosagetext"),
                )
            }
            None => Default::default(),
        };

    let reactions = extract_list(report, "patient.reaction");
    let reaction_names = reactions
        .iter()
        .map(|r| extract_str(r, "reactionmeddrapt", ""))
        .collect::<Vec<_>>()
        .join("; ");
    let outcomes = reactions
        .iter()
        .map(|r| translate(CodeKind::Outcome, &extract_str(r, "reactionoutcome", "")))
        .collect::<Vec<_>>()
        .join("; ");

    vec![
        s("safetyreportid"),
        s("receivedate"),
        s("serious"),
        coded(CodeKind::ReportType, "reporttype"),
        expedited.to_string(),
        s("occurcountry"),
        coded(CodeKind::Qualification, "primarysource.qualification"),
        s("patient.patientonsetage"),
        sex.to_string(),
        product,
        brand,
        maker,
        characterization,
        action,
        indication,
        dosage,
        reaction_names,
        outcomes,
    ]
}

struct RowSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl<W: Write> RowSink<W> {
    fn write(&mut self, report: &Value) -> Result<(), csv::Error> {
        self.writer.write_record(report_row(report))?;
        self.rows += 1;
        Ok(())
    }
}

/// Top-level object; everything but `results` is skipped unparsed.
struct Document<'a, W: Write>(&'a mut RowSink<W>);

impl<'de, W: Write> DeserializeSeed<'de> for Document<'_, W> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, W: Write> Visitor<'de> for Document<'_, W> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a drug-event document object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            if key == "results" {
                map.next_value_seed(Results(&mut *self.0))?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct Results<'a, W: Write>(&'a mut RowSink<W>);

impl<'de, W: Write> DeserializeSeed<'de> for Results<'_, W> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, W: Write> Visitor<'de> for Results<'_, W> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of reports")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(report) = seq.next_element::<Value>()? {
            self.0.write(&report).map_err(<A::Error as de::Error>::custom)?;
        }
        Ok(())
    }
}

/// Stream `reader` into CSV on `writer`; returns the number of report rows written.
pub fn extract_events_from<R: Read, W: Write>(reader: R, writer: W) -> Result<usize> {
    let mut sink = RowSink {
        writer: csv::Writer::from_writer(writer),
        rows: 0,
    };
    sink.writer.write_record(EVENT_COLUMNS).context("writing header")?;

    let mut json = serde_json::Deserializer::from_reader(reader);
    Document(&mut sink).deserialize(&mut json).context("parsing drug-event JSON")?;
    json.end().context("trailing data after drug-event document")?;

    sink.writer.flush().context("flushing CSV")?;
    Ok(sink.rows)
}

pub fn extract_events(input: &Path, output: &Path) -> Result<usize> {
    let src = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let dst = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let rows = extract_events_from(BufReader::new(src), BufWriter::new(dst))
        .with_context(|| format!("extracting {}", input.display()))?;
    tracing::info!(target: "events", rows, input = %input.display(), output = %output.display(), "drug events extracted");
    Ok(rows)
}
