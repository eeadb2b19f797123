#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Writes a refunds CSV with the given rows under `dir` and returns its path.
pub fn write_csv(dir: &Path, header: &[&str], rows: &[&[&str]]) -> PathBuf {
    let path = dir.join("refunds.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(header).unwrap();
    for row in rows {
        wtr.write_record(*row).unwrap();
    }
    wtr.flush().unwrap();
    path
}

/// Returns the contents of the single log file in `dir`.
pub fn read_only_log(dir: &Path) -> String {
    let logs: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(logs.len(), 1, "expected exactly one log file, found {logs:?}");
    fs::read_to_string(&logs[0]).unwrap()
}

pub fn count_logs(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|ext| ext == "log")
        })
        .count()
}
