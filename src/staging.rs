// Temporary copy of the sample program. Installers mutate manifests and lock
// files in place, so they only ever see this copy.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{Result, StagingError, VerifyError};

pub const TEMP_DIR_PREFIX: &str = "pulumi-verify-release-";

/// A freshly staged copy of the program.
///
/// The temporary root is removed when the workspace is dropped; `cleanup`
/// does the same eagerly and reports failures.
#[derive(Debug)]
pub struct StagedWorkspace {
    temp: TempDir,
    work_dir: PathBuf,
}

impl StagedWorkspace {
    /// Stage `source` under a new directory in the system temp location
    pub fn stage(source: &Path) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(temp_dir_failed)?;
        Self::stage_into(temp, source)
    }

    /// Stage `source` under a new directory inside `parent`
    pub fn stage_in(parent: &Path, source: &Path) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(temp_dir_failed)?;
        Self::stage_into(temp, source)
    }

    fn stage_into(temp: TempDir, source: &Path) -> Result<Self> {
        let work_dir = temp.path().join(program_dir_name(source));
        copy_tree(source, &work_dir)?;
        tracing::debug!(
            source = %source.display(),
            work_dir = %work_dir.display(),
            "Staged program"
        );
        Ok(Self { temp, work_dir })
    }

    /// Temporary root; also hosts the engine's file backend
    pub fn temp_root(&self) -> &Path {
        self.temp.path()
    }

    /// The program copy, `<temp_root>/<basename of source>`
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn cleanup(self) -> Result<()> {
        let root = self.temp.path().to_path_buf();
        self.temp.close().map_err(VerifyError::from)?;
        tracing::debug!(path = %root.display(), "Removed temporary directory");
        Ok(())
    }
}

fn temp_dir_failed(error: std::io::Error) -> VerifyError {
    StagingError::TempDirFailed {
        error: error.to_string(),
    }
    .into()
}

fn program_dir_name(source: &Path) -> PathBuf {
    // `.` and `..` have no file name of their own
    source
        .file_name()
        .map(PathBuf::from)
        .or_else(|| {
            source
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(PathBuf::from))
        })
        .unwrap_or_else(|| PathBuf::from("program"))
}

/// Recursive copy preserving the directory layout. Symlinks are recreated
/// as links on Unix and copied as their targets elsewhere.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            let from = e.path().unwrap_or(source).to_path_buf();
            VerifyError::from(StagingError::CopyFailed {
                to: destination.to_path_buf(),
                from,
                error: e.to_string(),
            })
        })?;

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(relative);
        let copy_failed = |error: std::io::Error| {
            VerifyError::from(StagingError::CopyFailed {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                error: error.to_string(),
            })
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_failed)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(copy_failed)?;
        } else {
            fs::copy(entry.path(), &target).map_err(copy_failed)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(link, target).map(|_| ())
}
