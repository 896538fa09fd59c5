//! Locating, backing up and replacing the interop artifact.
//!
//! Tree searches work over [`DirListing`] values so the matching logic can be
//! exercised without touching the disk; [`walk`] produces them from a real
//! directory tree.

use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Settings;
use crate::error::{Result, SetupError};

/// One directory of a tree and the names of the files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub dir: PathBuf,
    pub files: Vec<String>,
}

impl DirListing {
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|file| file == name)
    }
}

/// Top-down listing of every directory under `root`, siblings sorted by name.
/// Unreadable entries are skipped; a missing root yields nothing. Symlinks to
/// directories are neither listed as files nor followed.
pub fn walk(root: &Path) -> impl Iterator<Item = DirListing> + use<> {
    Listings {
        entries: WalkDir::new(root).sort_by(files_first).into_iter(),
        current: None,
    }
}

/// Files sort ahead of subdirectories, so a directory's files are yielded
/// right after the directory itself.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_dir_link(entry: &DirEntry) -> bool {
    entry.path_is_symlink() && entry.path().is_dir()
}

struct Listings {
    entries: walkdir::IntoIter,
    current: Option<DirListing>,
}

impl Iterator for Listings {
    type Item = DirListing;

    fn next(&mut self) -> Option<DirListing> {
        loop {
            let Some(entry) = self.entries.next() else {
                return self.current.take();
            };
            let Ok(entry) = entry else { continue };

            if entry.file_type().is_dir() {
                let listing = DirListing {
                    dir: entry.into_path(),
                    files: Vec::new(),
                };
                if let Some(finished) = self.current.replace(listing) {
                    return Some(finished);
                }
            } else if !is_dir_link(&entry) {
                let name = entry.file_name().to_str().map(String::from);
                if let (Some(listing), Some(name)) = (self.current.as_mut(), name) {
                    listing.files.push(name);
                }
            }
        }
    }
}

/// Path of the first file called `name` in walk order.
pub fn find_file<I>(listings: I, name: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = DirListing>,
{
    listings
        .into_iter()
        .find(|listing| listing.contains(name))
        .map(|listing| listing.dir.join(name))
}

/// Every directory holding a file called `name`, in walk order.
pub fn dirs_containing<I>(listings: I, name: &str) -> Vec<PathBuf>
where
    I: IntoIterator<Item = DirListing>,
{
    listings
        .into_iter()
        .filter(|listing| listing.contains(name))
        .map(|listing| listing.dir)
        .collect()
}

pub(crate) fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    cwd.join(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupPlan {
    /// Move the original aside and put a copy back in its place.
    Create { original: PathBuf, backup: PathBuf },
    /// A backup from an earlier run exists and must not be overwritten.
    Keep { backup: PathBuf },
}

pub fn plan_backup(original: &Path, extension: &str, backup_exists: bool) -> BackupPlan {
    let backup = original.with_extension(extension);
    if backup_exists {
        BackupPlan::Keep { backup }
    } else {
        BackupPlan::Create {
            original: original.to_path_buf(),
            backup,
        }
    }
}

pub fn apply_backup(plan: &BackupPlan) -> Result<()> {
    match plan {
        BackupPlan::Keep { backup } => {
            debug!(backup = %backup.display(), "backup already present");
            Ok(())
        }
        BackupPlan::Create { original, backup } => {
            fs::rename(original, backup).map_err(|e| SetupError::io("rename", original, e))?;
            fs::copy(backup, original).map_err(|e| SetupError::io("copy", backup, e))?;
            info!(backup = %backup.display(), "saved original artifact");
            Ok(())
        }
    }
}

/// The artifact in the dependency tree that gets replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetArtifact {
    pub path: PathBuf,
    pub backup: PathBuf,
}

/// Finds the artifact under `settings.packages_dir` (relative to `cwd`) and
/// makes sure an untouched backup of it exists. A backup left without its
/// artifact by an interrupted run is copied back into place first.
pub fn locate_target(settings: &Settings, cwd: &Path) -> Result<TargetArtifact> {
    let root = absolutize(cwd, &settings.packages_dir);
    let path = match find_file(walk(&root), &settings.artifact) {
        Some(path) => path,
        None => restore_orphaned_backup(settings, &root)?,
    };
    debug!(path = %path.display(), "found target artifact");

    let backup_exists = path.with_extension(&settings.backup_extension).exists();
    let plan = plan_backup(&path, &settings.backup_extension, backup_exists);
    apply_backup(&plan)?;

    let backup = match plan {
        BackupPlan::Create { backup, .. } | BackupPlan::Keep { backup } => backup,
    };
    Ok(TargetArtifact { path, backup })
}

fn restore_orphaned_backup(settings: &Settings, root: &Path) -> Result<PathBuf> {
    let backup_name = Path::new(&settings.artifact).with_extension(&settings.backup_extension);
    let backup = backup_name
        .to_str()
        .and_then(|name| find_file(walk(root), name));
    let Some(backup) = backup else {
        return Err(SetupError::NotFound {
            what: settings.artifact.clone(),
            location: format!("{} tree", settings.packages_dir.display()),
            hint: Some(format!("Please restore Nuget packages ({})", settings.readme_url)),
        });
    };

    let path = backup.with_file_name(&settings.artifact);
    fs::copy(&backup, &path).map_err(|e| SetupError::io("copy", &backup, e))?;
    warn!(backup = %backup.display(), "artifact was missing; restored it from backup");
    Ok(path)
}

/// Where the freshly built artifact comes from.
pub fn source_artifact(
    settings: &Settings,
    target: &TargetArtifact,
    shared: bool,
    module_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    if shared {
        Ok(module_dir()?.join(&settings.artifact))
    } else {
        let base = target
            .path
            .parent()
            .and_then(Path::parent)
            .unwrap_or(Path::new(""));
        Ok(base.join(&settings.mac_build_artifact))
    }
}

pub fn replace_target(source: &Path, target: &TargetArtifact) -> Result<()> {
    fs::copy(source, &target.path).map_err(|e| SetupError::io("copy", source, e))?;
    info!(from = %source.display(), to = %target.path.display(), "replaced artifact");
    Ok(())
}
