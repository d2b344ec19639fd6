//! Post-run report augmentation
//!
//! Stamps run metadata (hardware, execution locality) onto every result
//! record the engine emitted and recomputes each record's history id from
//! its final name. The pass is deliberately NOT idempotent across
//! invocations: running it twice appends the suffix twice and changes the
//! hash again. Callers run it exactly once per report folder per run.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::common::{Error, Result};

/// Filename suffix identifying engine result records
pub const RESULT_SUFFIX: &str = "result.json";

/// Outcome of one augmentation pass
#[derive(Debug, Default)]
pub struct AugmentSummary {
    /// Records rewritten in place
    pub updated: usize,
    /// Per-file failures; one corrupt record never blocks the rest
    pub failures: Vec<(PathBuf, String)>,
}

impl AugmentSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deterministic history id for a (final) record name
pub fn history_id(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}

/// Augment every `*result.json` directly under `folder`
///
/// The directory listing is captured before any rewrite begins, so files
/// created during the pass are not revisited and no file is processed twice
/// within one invocation. Each file runs inside its own failure boundary;
/// failures are logged and collected in the summary.
pub fn augment_reports(folder: &Path, hardware: &str, locality: &str) -> Result<AugmentSummary> {
    let mut paths: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.ends_with(RESULT_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let suffix = format!(" -- {hardware} -- {locality}").to_lowercase();

    let mut summary = AugmentSummary::default();
    for path in paths {
        match augment_file(&path, &suffix) {
            Ok(()) => summary.updated += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "report augmentation failed");
                summary.failures.push((path, e.to_string()));
            }
        }
    }

    tracing::info!(
        folder = %folder.display(),
        updated = summary.updated,
        failures = summary.failures.len(),
        "report records augmented"
    );
    Ok(summary)
}

fn augment_file(path: &Path, suffix: &str) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let mut record: Value = serde_json::from_str(&text)
        .map_err(|e| Error::report_augmentation(path, format!("malformed record: {e}")))?;

    let name = record
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::report_augmentation(path, "missing 'name' field"))?;

    let new_name = format!("{name}{suffix}");
    record["historyId"] = Value::String(history_id(&new_name));
    record["name"] = Value::String(new_name);

    fs::write(path, serde_json::to_string(&record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_record(dir: &Path, file: &str, name: &str) -> PathBuf {
        let path = dir.join(file);
        let record = serde_json::json!({ "name": name, "historyId": "stale", "status": "passed" });
        fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();
        path
    }

    fn read_record(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_augment_appends_lowercased_suffix_and_rehashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_record(dir.path(), "a-result.json", "Login works");

        let summary = augment_reports(dir.path(), "Rig-1", "Localhost").unwrap();
        assert_eq!(summary.updated, 1);
        assert!(summary.is_clean());

        let record = read_record(&path);
        assert_eq!(record["name"], "Login works -- rig-1 -- localhost");
        assert_eq!(
            record["historyId"],
            history_id("Login works -- rig-1 -- localhost").as_str()
        );
    }

    #[test]
    fn test_non_result_files_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("container.json");
        fs::write(&other, "{\"name\": \"ignore me\"}").unwrap();
        write_record(dir.path(), "a-result.json", "s");

        let summary = augment_reports(dir.path(), "rig", "localhost").unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(
            fs::read_to_string(&other).unwrap(),
            "{\"name\": \"ignore me\"}"
        );
    }

    #[test]
    fn test_second_invocation_mutates_again() {
        // Non-idempotence across invocations is the designed behavior: the
        // suffix is appended again and the hash moves with it.
        let dir = tempfile::tempdir().unwrap();
        let path = write_record(dir.path(), "a-result.json", "Login works");

        augment_reports(dir.path(), "rig", "localhost").unwrap();
        let first = read_record(&path);

        augment_reports(dir.path(), "rig", "localhost").unwrap();
        let second = read_record(&path);

        assert_ne!(first["name"], second["name"]);
        assert_ne!(first["historyId"], second["historyId"]);
        assert_eq!(
            second["name"],
            "Login works -- rig -- localhost -- rig -- localhost"
        );
    }

    #[test]
    fn test_corrupt_record_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("bad-result.json");
        fs::write(&corrupt, "{not json").unwrap();
        let good = write_record(dir.path(), "good-result.json", "s");

        let summary = augment_reports(dir.path(), "rig", "localhost").unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, corrupt);

        let record = read_record(&good);
        assert_eq!(record["name"], "s -- rig -- localhost");
    }

    #[test]
    fn test_record_without_name_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd-result.json");
        fs::write(&path, "{\"historyId\": \"x\"}").unwrap();

        let summary = augment_reports(dir.path(), "rig", "localhost").unwrap();
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].1.contains("missing 'name'"));
    }

    #[test]
    fn test_history_id_is_deterministic() {
        assert_eq!(history_id("a"), history_id("a"));
        assert_ne!(history_id("a"), history_id("b"));
        assert_eq!(history_id("a").len(), 64);
    }
}
