// src/load.rs
//! Loads harvested datasets, drug-event extracts and corpus metadata into warehouse tables.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Rows kept from the combined drug-event extracts.
pub const ADVERSE_EVENT_SAMPLE: usize = 1000;

pub const GROUND_TRUTH_TABLE: &str = "ground_truth_master";
pub const ADVERSE_EVENTS_TABLE: &str = "fda_adverse_events";
pub const KNOWLEDGE_BASE_TABLE: &str = "knowledge_base_master";

/// Column-named string rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Add a column filled by `value(row_index)`; no-op if it already exists.
    pub fn add_column(&mut self, name: &str, mut value: impl FnMut(usize) -> String) {
        if self.column(name).is_some() {
            return;
        }
        self.columns.push(name.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.push(value(i));
        }
    }

    /// Append `other`'s rows, aligning by column name and widening to the union of columns.
    pub fn extend(&mut self, other: Table) {
        for c in &other.columns {
            if self.column(c).is_none() {
                self.columns.push(c.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let positions: Vec<usize> = other.columns.iter().filter_map(|c| self.column(c)).collect();
        for src in other.rows {
            let mut row = vec![String::new(); self.columns.len()];
            for (value, &pos) in src.into_iter().zip(&positions) {
                row[pos] = value;
            }
            self.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Append,
}

#[async_trait]
pub trait TableSink: Send + Sync {
    /// Store `table` under `name`; returns rows written.
    async fn write_table(&self, name: &str, table: Table, mode: WriteMode) -> Result<usize>;
}

/// `{location}/{project}/{dataset}/{table}.csv`
pub struct LocalWarehouse {
    root: PathBuf,
}

impl LocalWarehouse {
    pub fn new(location: &Path, project_id: &str, dataset_id: &str) -> Self {
        Self {
            root: location.join(project_id).join(dataset_id),
        }
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.csv"))
    }
}

#[async_trait]
impl TableSink for LocalWarehouse {
    async fn write_table(&self, name: &str, table: Table, mode: WriteMode) -> Result<usize> {
        fs::create_dir_all(&self.root).with_context(|| format!("creating {}", self.root.display()))?;
        let path = self.table_path(name);

        let table = match mode {
            WriteMode::Append if path.exists() => {
                let mut existing = read_table(&path)?;
                existing.extend(table);
                existing
            }
            _ => table,
        };
        let written = table.len();

        let mut w = csv::Writer::from_path(&path).with_context(|| format!("opening {}", path.display()))?;
        w.write_record(&table.columns)?;
        for row in &table.rows {
            w.write_record(row)?;
        }
        w.flush().with_context(|| format!("flushing {}", path.display()))?;

        tracing::info!(target: "load", table = name, rows = written, ?mode, path = %path.display(), "table written");
        Ok(written)
    }
}

/// Records every call; for tests.
#[derive(Default)]
pub struct MockSink {
    pub calls: Mutex<Vec<(String, Table, WriteMode)>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableSink for MockSink {
    async fn write_table(&self, name: &str, table: Table, mode: WriteMode) -> Result<usize> {
        let n = table.len();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), table, mode));
        }
        Ok(n)
    }
}

pub fn read_table(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let columns: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let width = columns.len();
    let mut table = Table {
        columns,
        rows: Vec::new(),
    };
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("reading {}", path.display()))?;
        let mut row: Vec<String> = rec.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        table.rows.push(row);
    }
    Ok(table)
}

fn files_with(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(ext))
        })
        .collect();
    out.sort();
    Ok(out)
}

/// Coerce to `YYYY-MM-DD`; anything unparseable becomes empty.
fn coerce_date(s: &str) -> String {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map(|d| d.to_string())
        .unwrap_or_default()
}

/// Latest `clinical_ground_truth*.csv` (by modification time, then name) with `id` and `created_at`.
pub fn ground_truth_table(folder: &Path, now: DateTime<Local>) -> Result<Option<Table>> {
    let files = files_with(folder, "clinical_ground_truth", ".csv")?;
    let latest = files
        .iter()
        .max_by_key(|p| (fs::metadata(p).and_then(|m| m.modified()).ok(), (*p).clone()));
    let Some(latest) = latest else {
        tracing::warn!(target: "load", folder = %folder.display(), "no ground truth CSV files found");
        return Ok(None);
    };
    tracing::info!(target: "load", file = %latest.display(), "loading ground truth");

    let mut table = read_table(latest)?;
    for col in ["fda_approval_date", "update_date", "compliance_deadline"] {
        if let Some(i) = table.column(col) {
            for row in &mut table.rows {
                row[i] = coerce_date(&row[i]);
            }
        }
    }
    table.add_column("id", |_| uuid::Uuid::new_v4().to_string());
    let created = now.to_rfc3339();
    table.add_column("created_at", |_| created.clone());
    Ok(Some(table))
}

/// All `drug-event*.csv` combined, sampled down to [`ADVERSE_EVENT_SAMPLE`] rows (fixed seed).
pub fn adverse_events_table(folder: &Path, now: DateTime<Local>) -> Result<Option<Table>> {
    let files = files_with(folder, "drug-event", ".csv")?;
    if files.is_empty() {
        tracing::warn!(target: "load", folder = %folder.display(), "no adverse event CSV files found");
        return Ok(None);
    }

    let mut combined = Table::default();
    for f in &files {
        match read_table(f) {
            Ok(t) => {
                tracing::info!(target: "load", file = %f.display(), rows = t.len(), "adverse events read");
                combined.extend(t);
            }
            Err(e) => tracing::warn!(target: "load", file = %f.display(), error = ?e, "skipping unreadable file"),
        }
    }

    if combined.len() > ADVERSE_EVENT_SAMPLE {
        let mut rng = StdRng::seed_from_u64(42);
        combined.rows = combined
            .rows
            .choose_multiple(&mut rng, ADVERSE_EVENT_SAMPLE)
            .cloned()
            .collect();
        tracing::info!(target: "load", rows = combined.len(), "sampled adverse events");
    }

    let processed = now.to_rfc3339();
    combined.add_column("processed_at", |_| processed.clone());
    combined.add_column("source_file", |_| ADVERSE_EVENTS_TABLE.to_string());
    Ok(Some(combined))
}

/// Coarse document type from keywords in the file name.
pub fn document_type(file_name: &str) -> &'static str {
    let f = file_name.to_ascii_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| f.contains(w));
    if has(&["protocol", "sop"]) {
        "CLINICAL_PROTOCOL"
    } else if has(&["memo", "training"]) {
        "TRAINING_MATERIAL"
    } else if has(&["manual", "device"]) {
        "DEVICE_MANUAL"
    } else if has(&["guideline", "guidance"]) {
        "CLINICAL_GUIDELINE"
    } else {
        "GENERAL_CLINICAL"
    }
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// One metadata row per document under `corpus_dir` (hidden and `.tmp` files skipped).
pub fn knowledge_base_table(corpus_dir: &Path, now: DateTime<Local>) -> Result<Option<Table>> {
    if !corpus_dir.is_dir() {
        tracing::warn!(target: "load", dir = %corpus_dir.display(), "document corpus folder not found");
        return Ok(None);
    }
    let mut files = Vec::new();
    walk_files(corpus_dir, &mut files)?;
    files.sort();

    let mut table = Table::new([
        "document_id",
        "document_name",
        "document_uri",
        "document_type",
        "source_format",
        "upload_timestamp",
        "processing_status",
        "file_size_bytes",
    ]);
    let stamp = now.to_rfc3339();
    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || name.ends_with(".tmp") {
            continue;
        }
        let relative = path.strip_prefix(corpus_dir).unwrap_or(&path);
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_uppercase())
            .unwrap_or_else(|| "UNKNOWN".into());
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        table.rows.push(vec![
            uuid::Uuid::new_v4().to_string(),
            name.clone(),
            format!("hospital_documents/{}", relative.to_string_lossy().replace('\\', "/")),
            document_type(&name).to_string(),
            format,
            stamp.clone(),
            "UPLOADED".to_string(),
            size.to_string(),
        ]);
    }
    Ok(Some(table))
}

/// Optional pass-through sheets: (file, table, date column -> derived column).
const PASSTHROUGH: [(&str, &str, Option<(&str, &str)>); 4] = [
    ("Recalls.csv", "fda_recalls", None),
    ("fda_safety.csv", "fda_safety_communications", Some(("Date", "alert_date"))),
    ("DrugAlerts_FDA.csv", "fda_drug_alerts", Some(("Date", "alert_date"))),
    ("FDA_Stmts.csv", "fda_public_statements", Some(("Date", "statement_date"))),
];

fn passthrough_table(path: &Path, date: Option<(&str, &str)>, now: DateTime<Local>) -> Result<Table> {
    let mut table = read_table(path)?;
    let processed = now.to_rfc3339();
    table.add_column("processed_at", |_| processed.clone());
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
    table.add_column("source_file", |_| stem.clone());
    if let Some((src, derived)) = date {
        if let Some(i) = table.column(src) {
            let values: Vec<String> = table.rows.iter().map(|r| coerce_date(&r[i])).collect();
            table.add_column(derived, |row| values[row].clone());
        }
    }
    Ok(table)
}

/// Rows written per table in one load.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub tables: Vec<(String, usize)>,
    pub failures: Vec<(String, String)>,
}

async fn write_step<S: TableSink + ?Sized>(
    sink: &S,
    summary: &mut LoadSummary,
    name: &str,
    table: Result<Option<Table>>,
    mode: WriteMode,
) {
    let outcome = match table {
        Ok(Some(t)) => sink.write_table(name, t, mode).await.map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(Some(rows)) => summary.tables.push((name.to_string(), rows)),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(target: "load", table = name, error = ?e, "table load failed");
            summary.failures.push((name.to_string(), format!("{e:#}")));
        }
    }
}

/// Load everything found in `folder`. A missing folder is an error; a failing table is logged
/// and recorded in the summary while the rest continue.
pub async fn load_folder<S: TableSink + ?Sized>(sink: &S, folder: &Path, corpus_dir: &Path) -> Result<LoadSummary> {
    if !folder.is_dir() {
        bail!("data folder not found: {}", folder.display());
    }
    tracing::info!(target: "load", folder = %folder.display(), "starting data load");
    let now = Local::now();
    let mut summary = LoadSummary::default();

    write_step(sink, &mut summary, GROUND_TRUTH_TABLE, ground_truth_table(folder, now), WriteMode::Replace).await;
    write_step(sink, &mut summary, ADVERSE_EVENTS_TABLE, adverse_events_table(folder, now), WriteMode::Replace).await;

    for (file, table, date) in PASSTHROUGH {
        let path = folder.join(file);
        if path.is_file() {
            write_step(sink, &mut summary, table, passthrough_table(&path, date, now).map(Some), WriteMode::Replace)
                .await;
        }
    }

    write_step(
        sink,
        &mut summary,
        KNOWLEDGE_BASE_TABLE,
        knowledge_base_table(corpus_dir, now),
        WriteMode::Append,
    )
    .await;

    Ok(summary)
}
