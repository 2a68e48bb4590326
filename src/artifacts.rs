use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Names written by the most recent persist, kept beside the artifacts
pub const MANIFEST_FILE: &str = ".artifacts.json";

/// Persists a run's artifacts under their well-known names.
///
/// The sink holds exactly one run: whatever a previous run saved and the
/// current one did not produce is gone afterwards.
pub trait ArtifactSink: Send + Sync {
    fn persist(&self, artifacts: &BTreeMap<String, Vec<u8>>) -> Result<Vec<PathBuf>>;
}

/// Reject names that would escape the artifact directory
pub fn validate_artifact_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        anyhow::bail!("Invalid artifact name: {:?}", name);
    }
    Ok(())
}

/// Writes artifacts as files in one directory, replacing the previous run's set
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an artifact is (or would be) stored at
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_artifact_name(name)?;
        Ok(self.dir.join(name))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(bytes)
            .with_context(|| format!("Failed to write {}", name))?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Names the previous persist recorded; empty when there is no manifest
    fn previous_names(&self) -> BTreeSet<String> {
        let path = self.dir.join(MANIFEST_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return BTreeSet::new(),
        };
        match serde_json::from_str::<BTreeSet<String>>(&raw) {
            Ok(names) => names,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                BTreeSet::new()
            }
        }
    }

    fn remove_stale(&self, previous: &BTreeSet<String>, current: &BTreeMap<String, Vec<u8>>) {
        for name in previous.iter().filter(|name| !current.contains_key(*name)) {
            let Ok(path) = self.path_for(name) else {
                continue;
            };
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove stale {}: {}", path.display(), e),
            }
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn persist(&self, artifacts: &BTreeMap<String, Vec<u8>>) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // Validate everything before writing anything
        for name in artifacts.keys() {
            validate_artifact_name(name)?;
        }

        let previous = self.previous_names();

        let paths = artifacts
            .iter()
            .map(|(name, bytes)| self.write_atomic(name, bytes))
            .collect::<Result<Vec<_>>>()?;

        self.remove_stale(&previous, artifacts);
        let names: BTreeSet<&String> = artifacts.keys().collect();
        self.write_atomic(MANIFEST_FILE, &serde_json::to_vec(&names)?)?;

        info!("Saved {} artifact(s) to {}", paths.len(), self.dir.display());
        Ok(paths)
    }
}
