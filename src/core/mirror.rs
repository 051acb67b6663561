//! Dependency mirroring - copying mapped sources into the package

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use super::error::PackError;
use super::remap::{EntryKind, MappedEntry, PathMapping};

/// What happened to the entries of one mirroring pass
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Destinations written
    pub copied: Vec<PathBuf>,
    /// Sources that no longer exist
    pub skipped: Vec<PathBuf>,
    /// Per-entry copy failures
    pub failed: Vec<PackError>,
}

impl MirrorReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Copies every entry of a [`PathMapping`] under a package root
pub struct DependencyMirror<'a> {
    root: &'a Path,
}

impl<'a> DependencyMirror<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Mirror classpath entries, then auxiliary entries.
    ///
    /// Missing sources and copy failures are logged and recorded; they never
    /// stop the remaining entries.
    pub fn mirror(&self, mapping: &PathMapping) -> MirrorReport {
        let mut report = MirrorReport::default();
        for entry in mapping.classpath_entries() {
            self.mirror_entry(entry, &mut report);
        }
        for entry in mapping.auxiliary_entries() {
            self.mirror_entry(entry, &mut report);
        }
        info!(
            "Mirrored {} entries ({} missing, {} failed)",
            report.copied.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    fn mirror_entry(&self, entry: &MappedEntry, report: &mut MirrorReport) {
        let source = Path::new(&entry.source);
        let destination = entry.destination.to_host(self.root);

        if !source.exists() {
            match entry.kind {
                EntryKind::Classpath => warn!("Path not found: {}", source.display()),
                EntryKind::Auxiliary => {
                    warn!("Extra file or directory not found: {}", source.display())
                }
            }
            report.skipped.push(source.to_path_buf());
            return;
        }

        match copy_path(source, &destination) {
            Ok(()) => report.copied.push(destination),
            Err(e) => {
                let err = PackError::CopyFailure {
                    source_path: source.to_path_buf(),
                    destination,
                    reason: e.to_string(),
                };
                warn!("{}", err);
                report.failed.push(err);
            }
        }
    }
}

/// Copy a file, or a directory tree merged over whatever is already there
fn copy_path(source: &Path, destination: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        copy_tree(source, destination)?;
        info!(
            "Copied directory: {} -> {}",
            source.display(),
            destination.display()
        );
    } else {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, destination)?;
        info!("Copied file: {} -> {}", source.display(), destination.display());
    }
    Ok(())
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
