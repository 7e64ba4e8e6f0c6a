use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;
use tracing::error;

use crate::engine::EngineError;

/// Written when a run does not reproduce the expected state hash.
#[derive(Debug, Serialize)]
pub struct BugReport {
    pub expected_hash: String,
    pub actual_hash: String,
    pub seed: u64,
    pub event_count: usize,
    pub events_processed: u64,
    pub timed_out: bool,
    pub final_metrics: String,
}

#[derive(Debug)]
pub struct DiagnosticsCollector {
    dir: PathBuf,
    bug_reports: Vec<PathBuf>,
}

impl DiagnosticsCollector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            bug_reports: Vec::new(),
        }
    }

    pub fn bug_reports(&self) -> &[PathBuf] {
        &self.bug_reports
    }

    pub fn record_bug_report(&mut self, report: &BugReport) -> Result<PathBuf, EngineError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        fs::create_dir_all(&self.dir)?;
        let path = unique_path(&self.dir, timestamp);
        fs::write(&path, serde_yaml::to_string(report)?)?;
        error!(path = %path.display(), "bug report written");

        self.bug_reports.push(path.clone());
        Ok(path)
    }
}

fn unique_path(dir: &Path, timestamp: u64) -> PathBuf {
    let mut path = dir.join(format!("bug_report_{timestamp}.yaml"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("bug_report_{timestamp}_{n}.yaml"));
        n += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BugReport {
        BugReport {
            expected_hash: "aa".into(),
            actual_hash: "bb".into(),
            seed: 42,
            event_count: 10,
            events_processed: 21,
            timed_out: false,
            final_metrics: "Total PRR 1.0000".into(),
        }
    }

    #[test]
    fn writes_yaml_reports_without_clobbering() {
        let dir = tempfile::tempdir().unwrap();
        let mut diagnostics = DiagnosticsCollector::new(dir.path().join("reports"));
        let first = diagnostics.record_bug_report(&report()).unwrap();
        let second = diagnostics.record_bug_report(&report()).unwrap();

        assert_ne!(first, second);
        assert_eq!(diagnostics.bug_reports().len(), 2);
        let text = fs::read_to_string(first).unwrap();
        assert!(text.contains("expected_hash: aa"));
        assert!(text.contains("seed: 42"));
    }
}
