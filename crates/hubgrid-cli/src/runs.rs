//! Discovery of recorded runs below an output root.
//!
//! Every `solve` writes `run-<uuid>.json` next to its result file
//! `<label>_<strategy>_<withBat|noBat>-<uuid>.json`. Only the former are
//! manifests; result files and unrelated JSON are ignored.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

use hubgrid_cli::manifest::{self, ManifestEntry};

#[derive(Clone, Debug)]
pub struct RunRecord {
    pub manifest: ManifestEntry,
    pub path: PathBuf,
}

impl RunRecord {
    pub fn status(&self) -> &str {
        self.manifest.param("status").unwrap_or("-")
    }

    /// Recorded outputs that are no longer on disk.
    pub fn missing_outputs(&self) -> Vec<&str> {
        self.manifest
            .outputs
            .iter()
            .map(String::as_str)
            .filter(|output| !Path::new(output).exists())
            .collect()
    }

    /// File name of the result, or `-` for runs that produced none.
    pub fn result_name(&self) -> String {
        self.manifest
            .outputs
            .first()
            .and_then(|output| Path::new(output).file_name())
            .map_or_else(|| "-".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

#[derive(Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub command: String,
    pub timestamp: String,
    pub version: String,
    pub status: String,
    pub manifest_path: String,
    pub outputs: Vec<String>,
    pub missing_outputs: Vec<String>,
}

impl RunSummary {
    pub fn from_record(record: &RunRecord) -> Self {
        Self {
            run_id: record.manifest.run_id.clone(),
            command: record.manifest.command.clone(),
            timestamp: record.manifest.timestamp.clone(),
            version: record.manifest.version.clone(),
            status: record.status().to_string(),
            manifest_path: record.path.display().to_string(),
            outputs: record.manifest.outputs.clone(),
            missing_outputs: record
                .missing_outputs()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Find every run manifest below `root`, oldest first.
///
/// Manifests that cannot be read, or whose run id disagrees with their file
/// name, are skipped with a warning.
pub fn discover_runs(root: &Path) -> Result<Vec<RunRecord>> {
    if !root.exists() {
        return Ok(vec![]);
    }

    let mut runs = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(should_enter)
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(run_id) = manifest_run_id(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        let path = entry.path().to_path_buf();
        match manifest::read_manifest(&path) {
            Ok(manifest) if Uuid::parse_str(&manifest.run_id).ok() == Some(run_id) => {
                runs.push(RunRecord { manifest, path });
            }
            Ok(manifest) => warn!(
                path = %path.display(),
                recorded = %manifest.run_id,
                "manifest run id does not match its file name, skipping"
            ),
            Err(err) => warn!(path = %path.display(), "skipping unreadable manifest: {err:#}"),
        }
    }
    runs.sort_by(|a, b| a.manifest.timestamp.cmp(&b.manifest.timestamp));
    Ok(runs)
}

pub fn summaries(records: &[RunRecord]) -> Vec<RunSummary> {
    records.iter().map(RunSummary::from_record).collect()
}

/// Run id of a manifest file name `run-<uuid>.json`.
fn manifest_run_id(file_name: &str) -> Option<Uuid> {
    let id = file_name.strip_prefix("run-")?.strip_suffix(".json")?;
    Uuid::parse_str(id).ok()
}

/// Hidden directories and build trees never hold run outputs.
fn should_enter(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name != "target" && !name.starts_with('.'))
}
