// src/seen.rs
//! Seen-set: the append-only registry of source URLs harvested in earlier runs.
//!
//! The backing file holds one URL per line. It is read once when a run starts and only ever
//! appended to (never rewritten, never truncated) with the URLs accepted during that run.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SeenError {
    #[error("reading seen-set {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("appending to seen-set {path}: {source}")]
    Append { path: PathBuf, source: io::Error },
}

/// Load every non-empty trimmed line. A missing file is an empty set.
pub fn load(path: &Path) -> Result<HashSet<String>, SeenError> {
    match fs::read_to_string(path) {
        Ok(body) => Ok(body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(source) => Err(SeenError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Append one newline-terminated line per entry. No-op for an empty input; creates the file
/// (and missing parent directories) on first use.
pub fn append<I, S>(path: &Path, urls: I) -> Result<usize, SeenError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let urls: Vec<S> = urls.into_iter().collect();
    if urls.is_empty() {
        return Ok(0);
    }
    let err = |source| SeenError::Append {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(err)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(err)?;
    let mut w = BufWriter::new(file);
    for u in &urls {
        writeln!(w, "{}", u.as_ref()).map_err(err)?;
    }
    w.flush().map_err(err)?;
    Ok(urls.len())
}

/// In-memory view for one run: the persisted history plus URLs accepted so far in this run.
#[derive(Debug, Default)]
pub struct SeenSet {
    persisted: HashSet<String>,
    fresh: Vec<String>,
    fresh_index: HashSet<String>,
}

impl SeenSet {
    pub fn from_persisted(persisted: HashSet<String>) -> Self {
        Self {
            persisted,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, SeenError> {
        load(path).map(Self::from_persisted)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.persisted.contains(url) || self.fresh_index.contains(url)
    }

    /// Record `url` as accepted in this run. `false` if it was already known.
    pub fn insert(&mut self, url: &str) -> bool {
        if self.contains(url) {
            return false;
        }
        self.fresh_index.insert(url.to_string());
        self.fresh.push(url.to_string());
        true
    }

    /// URLs accepted in this run, in acceptance order.
    pub fn fresh(&self) -> &[String] {
        &self.fresh
    }

    pub fn persisted_len(&self) -> usize {
        self.persisted.len()
    }

    /// Append this run's URLs to the backing store.
    pub fn persist_fresh(&self, path: &Path) -> Result<usize, SeenError> {
        append(path, &self.fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load(&dir.path().join("nope.txt")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn blank_lines_and_padding_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("seen.txt");
        fs::write(&p, "  https://a  \n\n\thttps://b\n   \n").unwrap();
        let set = load(&p).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("https://a"));
        assert!(set.contains("https://b"));
    }

    #[test]
    fn empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("seen.txt");
        assert_eq!(append(&p, Vec::<String>::new()).unwrap(), 0);
        assert!(!p.exists());
    }

    #[test]
    fn append_creates_parents_and_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("state").join("seen.txt");
        append(&p, ["https://a"]).unwrap();
        append(&p, ["https://b", "https://c"]).unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "https://a\nhttps://b\nhttps://c\n");
    }

    #[test]
    fn seen_set_tracks_fresh_separately() {
        let mut s = SeenSet::from_persisted(["old".to_string()].into_iter().collect());
        assert!(!s.insert("old"));
        assert!(s.insert("new"));
        assert!(!s.insert("new"));
        assert!(s.contains("new"));
        assert_eq!(s.fresh(), ["new".to_string()]);
        assert_eq!(s.persisted_len(), 1);
    }
}
