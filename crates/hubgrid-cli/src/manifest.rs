use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Record of one CLI run, written next to its outputs as `run-<uuid>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub timestamp: String,
    pub outputs: Vec<String>,
    pub params: Vec<Param>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl ManifestEntry {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

pub fn manifest_path(dir: &Path, run_id: &str) -> PathBuf {
    dir.join(format!("run-{run_id}.json"))
}

pub fn record_manifest(
    dir: &Path,
    run_id: &str,
    command: &str,
    outputs: &[PathBuf],
    params: &[(&str, String)],
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let manifest = ManifestEntry {
        run_id: run_id.to_string(),
        command: command.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
        params: params
            .iter()
            .map(|(k, v)| Param {
                name: k.to_string(),
                value: v.clone(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    let path = manifest_path(dir, run_id);
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json = fs::read_to_string(path)?;
    let manifest = serde_json::from_str(&json)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_round_trip_keeps_params() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("hub_cost_noBat-abc.json");
        let path = record_manifest(
            dir.path(),
            "abc",
            "solve",
            &[out.clone()],
            &[("status", "Optimal".to_string())],
        )
        .unwrap();

        assert_eq!(path, dir.path().join("run-abc.json"));
        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.run_id, "abc");
        assert_eq!(manifest.command, "solve");
        assert_eq!(manifest.param("status"), Some("Optimal"));
        assert_eq!(manifest.param("missing"), None);
        assert_eq!(manifest.outputs, vec![out.display().to_string()]);
        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.timestamp).is_ok());
    }
}
