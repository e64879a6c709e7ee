//! Integrity manifest for the artifact directory.
//!
//! `manifest.json` binds file names (relative to the manifest's directory) to
//! their SHA-256 digests. When a manifest is present, every file it lists is
//! verified before anything is loaded, and the file being loaded must itself
//! be listed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::StoreError;

/// File name of the manifest inside the artifact directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Allowed clock skew for `created_at`, in seconds.
const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    /// Hash the named files inside `dir`.
    ///
    /// # Errors
    /// Returns error if a name is not a plain relative path or a file cannot be read.
    pub fn for_files<S: AsRef<str>>(dir: &Path, names: &[S]) -> Result<Self, StoreError> {
        let mut files = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            check_relative(name)?;
            let path = dir.join(name);
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: Some(chrono::Utc::now()),
            files,
        })
    }

    /// Read `manifest.json` from `dir`, if present.
    ///
    /// # Errors
    /// Returns error if the manifest exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Option<Self>, StoreError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let manifest: Self = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::ManifestInvalid(format!("{MANIFEST_FILE}: {e}")))?;
        Ok(Some(manifest))
    }

    /// Write the manifest as pretty JSON into `dir`.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn write(&self, dir: &Path) -> Result<(), StoreError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))
    }

    #[must_use]
    pub fn binds(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Check format fields and every bound file's digest.
    ///
    /// # Errors
    /// Returns `ManifestInvalid` for format problems and `HashMismatch` for tampered files.
    pub fn verify(&self, dir: &Path) -> Result<(), StoreError> {
        if self.version != MANIFEST_VERSION {
            return Err(StoreError::ManifestInvalid(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.files.is_empty() {
            return Err(StoreError::ManifestInvalid("no files listed".into()));
        }
        if let Some(created_at) = self.created_at {
            let skew = created_at.timestamp() - chrono::Utc::now().timestamp();
            if skew > MAX_CLOCK_SKEW_SECS {
                return Err(StoreError::ManifestInvalid(
                    "created_at is in the future".into(),
                ));
            }
        }

        for (name, expected) in &self.files {
            check_relative(name)?;
            let path = dir.join(name);
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            if !sha256_hex(&bytes).eq_ignore_ascii_case(expected.trim()) {
                return Err(StoreError::HashMismatch(name.clone()));
            }
        }
        Ok(())
    }
}

fn check_relative(name: &str) -> Result<(), StoreError> {
    let plain = Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if name.is_empty() || !plain {
        return Err(StoreError::ManifestInvalid(format!(
            "{name:?} is not a plain relative path"
        )));
    }
    Ok(())
}

/// Verify `path` against the manifest in its directory.
///
/// Without a manifest this succeeds unless `require` is set.
///
/// # Errors
/// Returns error if the manifest is required but missing, is invalid, does
/// not bind `path`, or any bound file fails its digest check.
pub fn verify_bound_file(path: &Path, require: bool) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match Manifest::load(dir)? {
        None if require => Err(StoreError::ManifestMissing(dir.join(MANIFEST_FILE))),
        None => {
            tracing::debug!("No manifest next to {:?}; integrity check skipped", path);
            Ok(())
        }
        Some(manifest) => {
            manifest.verify(dir)?;
            if !manifest.binds(&name) {
                return Err(StoreError::UnboundFile(name));
            }
            tracing::debug!("Verified {} against manifest ({} files)", name, manifest.files.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_roundtrip_and_tamper_detection() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("artifact.json"), b"{}").expect("write");
        fs::write(dir.join("cases.csv"), b"agent\nSarin\n").expect("write");

        let manifest =
            Manifest::for_files(dir, &["artifact.json", "cases.csv"]).expect("Should hash");
        manifest.write(dir).expect("Should write");

        verify_bound_file(&dir.join("artifact.json"), true).expect("Should verify");

        fs::write(dir.join("cases.csv"), b"agent\nVX\n").expect("write");
        assert!(matches!(
            verify_bound_file(&dir.join("artifact.json"), true),
            Err(StoreError::HashMismatch(name)) if name == "cases.csv"
        ));
    }

    #[test]
    fn test_unbound_file_rejected() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("a.json"), b"1").expect("write");
        fs::write(dir.join("b.json"), b"2").expect("write");
        Manifest::for_files(dir, &["a.json"])
            .expect("hash")
            .write(dir)
            .expect("write");

        assert!(matches!(
            verify_bound_file(&dir.join("b.json"), false),
            Err(StoreError::UnboundFile(_))
        ));
    }

    #[test]
    fn test_missing_manifest() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("artifact.json");
        assert!(verify_bound_file(&path, false).is_ok());
        assert!(matches!(
            verify_bound_file(&path, true),
            Err(StoreError::ManifestMissing(_))
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        let temp = tempdir().expect("tempdir");
        assert!(Manifest::for_files(temp.path(), &["../etc/passwd"]).is_err());
    }
}
