//! # Output Manifest
//!
//! `factgen.manifest.json` sits next to the generated files and records, for
//! each one, the run parameters, the row counts and a SHA-256 of the
//! contents. Two runs with the same parameters must produce identical
//! digests; comparing manifests is the cheapest way to confirm a sharded
//! run matches a single-process one.

pub mod types;

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use self::types::Manifest;
use crate::error::{FactGenError, Result};

/// Default manifest file name.
pub const MANIFEST_FILE_NAME: &str = "factgen.manifest.json";

/// Write a manifest to disk atomically.
///
/// Writes to a temporary file in the same directory, then renames it into
/// place, so an interrupted write leaves the previous manifest intact.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest).map_err(|e| FactGenError::Manifest {
        message: format!("Failed to serialize manifest: {}", e),
    })?;

    let dir = path.parent().unwrap_or(Path::new("."));
    let tmp_path = dir.join(".factgen.manifest.json.tmp");

    let mut file = fs::File::create(&tmp_path).map_err(|e| FactGenError::Output {
        message: format!("Failed to create temp manifest at {}", tmp_path.display()),
        source: e,
    })?;
    file.write_all(json.as_bytes())
        .map_err(|e| FactGenError::Output {
            message: format!("Failed to write temp manifest at {}", tmp_path.display()),
            source: e,
        })?;
    file.sync_all().map_err(|e| FactGenError::Output {
        message: "Failed to sync manifest to disk".to_string(),
        source: e,
    })?;

    fs::rename(&tmp_path, path).map_err(|e| FactGenError::Output {
        message: format!(
            "Failed to rename {} → {}",
            tmp_path.display(),
            path.display()
        ),
        source: e,
    })?;

    Ok(())
}

/// Read a manifest from disk.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).map_err(|e| FactGenError::Output {
        message: format!("Failed to read manifest from {}", path.display()),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| FactGenError::Manifest {
        message: format!("Failed to parse manifest {}: {}", path.display(), e),
    })
}

/// Read the manifest at `path`, or start a new one if none exists yet.
pub fn read_or_new(path: &Path) -> Result<Manifest> {
    if path.exists() {
        read_manifest(path)
    } else {
        Ok(Manifest::new())
    }
}

/// SHA-256 (lowercase hex) and size of a file, streamed in blocks.
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let mut file = fs::File::open(path).map_err(|e| FactGenError::Output {
        message: format!("Failed to open {} for hashing", path.display()),
        source: e,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut bytes = 0u64;
    loop {
        let n = file.read(&mut buf).map_err(|e| FactGenError::Output {
            message: format!("Failed to read {} for hashing", path.display()),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), bytes))
}

/// Files in `dir` whose current digest differs from the manifest (or that
/// are missing).
pub fn stale_files(manifest: &Manifest, dir: &Path) -> Result<Vec<String>> {
    let mut stale = Vec::new();
    for entry in &manifest.files {
        let path = dir.join(&entry.file);
        if !path.exists() {
            stale.push(entry.file.clone());
            continue;
        }
        let (digest, _) = hash_file(&path)?;
        if digest != entry.sha256 {
            stale.push(entry.file.clone());
        }
    }
    Ok(stale)
}

/// How a directory's files compare with its manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestCheck {
    /// Entries in the manifest.
    pub recorded: usize,
    /// Recorded files that are missing or whose digest changed.
    pub stale: Vec<String>,
    /// Files checked that have no manifest entry.
    pub unrecorded: Vec<String>,
}

impl ManifestCheck {
    pub fn is_clean(&self) -> bool {
        self.stale.is_empty() && self.unrecorded.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            return format!("Manifest:      {} files, all digests match", self.recorded);
        }
        let mut lines = vec![format!("Manifest:      {} files", self.recorded)];
        for file in &self.stale {
            lines.push(format!("  ! {} is missing or changed since it was generated", file));
        }
        for file in &self.unrecorded {
            lines.push(format!("  ? {} is not in the manifest", file));
        }
        lines.join("\n")
    }
}

/// Check `dir` against its manifest. `files` are the data files found on
/// disk, by name.
pub fn check_directory(manifest: &Manifest, dir: &Path, files: &[String]) -> Result<ManifestCheck> {
    let unrecorded = files
        .iter()
        .filter(|file| manifest.entry(file.as_str()).is_none())
        .cloned()
        .collect();
    Ok(ManifestCheck {
        recorded: manifest.files.len(),
        stale: stale_files(manifest, dir)?,
        unrecorded,
    })
}
