// tests/seen_store.rs
use clinical_ground_truth::seen::{self, SeenSet};
use std::fs;

#[test]
fn missing_file_is_empty_and_append_creates_it() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("state/seen.txt");

    assert!(seen::load(&p).unwrap().is_empty());
    assert_eq!(seen::append(&p, Vec::<String>::new()).unwrap(), 0);
    assert!(!p.exists());

    assert_eq!(seen::append(&p, ["https://a", "https://b"]).unwrap(), 2);
    assert_eq!(fs::read_to_string(&p).unwrap(), "https://a\nhttps://b\n");
}

#[test]
fn load_trims_and_skips_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seen.txt");
    fs::write(&p, "  https://a  \n\n\nhttps://b\r\nhttps://a\n").unwrap();

    let set = seen::load(&p).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains("https://a"));
    assert!(set.contains("https://b"));
}

#[test]
fn only_fresh_urls_are_appended() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seen.txt");
    fs::write(&p, "https://old\n").unwrap();

    let mut set = SeenSet::load(&p).unwrap();
    assert!(!set.insert("https://old"));
    assert!(set.insert("https://new"));
    assert!(!set.insert("https://new"));
    assert!(set.contains("https://new"));
    assert_eq!(set.fresh(), ["https://new".to_string()]);

    assert_eq!(set.persist_fresh(&p).unwrap(), 1);
    assert_eq!(fs::read_to_string(&p).unwrap(), "https://old\nhttps://new\n");
}
