// tests/drug_events.rs
use clinical_ground_truth::events::{extract_events, EVENT_COLUMNS};
use serde_json::json;
use std::fs;

#[test]
fn dump_file_becomes_one_row_per_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("drug-event-0001-of-0001.json");
    let output = dir.path().join("drug-event-0001.csv");

    let doc = json!({
        "meta": {"last_updated": "2024-01-01"},
        "results": [
            {
                "safetyreportid": "5001",
                "serious": "1",
                "reporttype": "2",
                "primarysource": {"qualification": "1"},
                "patient": {
                    "patientsex": "2",
                    "drug": [{"medicinalproduct": "INSULIN", "drugcharacterization": "2"}],
                    "reaction": [{"reactionmeddrapt": "Hypoglycaemia", "reactionoutcome": "2"}]
                }
            },
            {"safetyreportid": "5002", "patient": {"reaction": []}}
        ]
    });
    fs::write(&input, serde_json::to_vec(&doc).unwrap()).unwrap();

    let rows = extract_events(&input, &output).unwrap();
    assert_eq!(rows, 2);

    let mut rdr = csv::Reader::from_path(&output).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, EVENT_COLUMNS);

    let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(&records[0][0], "5001");
    assert_eq!(&records[0][3], "Report from study");
    assert_eq!(&records[0][6], "Physician");
    assert_eq!(&records[0][8], "Female");
    assert_eq!(&records[0][12], "Concomitant");
    assert_eq!(&records[0][17], "Recovering/Resolving");
    assert_eq!(&records[1][16], "");
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_events(&dir.path().join("nope.json"), &dir.path().join("out.csv")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.json"));
}
