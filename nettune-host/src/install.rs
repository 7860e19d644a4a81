//! Transactional installation of the rendered document.
//!
//! Content is written to a fresh temporary file in the destination's
//! directory and renamed onto the destination in one step. A reader of the
//! destination path sees either the old file or the complete new one, never
//! a partial write. On any failure the destination is untouched and the
//! temporary file is cleaned up by its RAII guard.

use std::{
    fs,
    io::{self, Write},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to stage temporary file in {dir}: {source}")]
    Stage { dir: PathBuf, source: io::Error },

    #[error("failed to publish {dest}: {source}")]
    Publish { dest: PathBuf, source: io::Error },

    #[error("failed to remove {dest}: {source}")]
    Remove { dest: PathBuf, source: io::Error },

    #[error("destination {0} has no parent directory")]
    NoParent(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Write `contents` to `dest` atomically via a sibling temporary file.
///
/// An existing destination keeps its file mode across the rewrite; a fresh
/// one is published as 0644 rather than with the temporary file's private
/// mode.
pub fn write_atomic(contents: &str, dest: &Path) -> Result<()> {
    let dir = dest.parent().ok_or_else(|| Error::NoParent(dest.to_path_buf()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Stage { dir: dir.to_path_buf(), source: e })?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| Error::Stage { dir: dir.to_path_buf(), source: e })?;

    let permissions = match fs::metadata(dest) {
        Ok(meta) => meta.permissions(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::Permissions::from_mode(0o644),
        Err(e) => return Err(Error::Publish { dest: dest.to_path_buf(), source: e }),
    };
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| Error::Stage { dir: dir.to_path_buf(), source: e })?;

    // PersistError hands the temp file back; dropping it unlinks the file.
    tmp.persist(dest).map_err(|e| Error::Publish { dest: dest.to_path_buf(), source: e.error })?;

    Ok(())
}

/// Publish the rendered document at its canonical path.
pub fn install(document: &str, dest: &Path) -> Result<()> {
    write_atomic(document, dest)?;
    tracing::info!(dest = %dest.display(), bytes = document.len(), "installed tuning document");
    Ok(())
}

/// Delete the canonical artifact. Returns `false` if it was already absent.
pub fn remove(dest: &Path) -> Result<bool> {
    match fs::remove_file(dest) {
        Ok(()) => {
            tracing::info!(dest = %dest.display(), "removed tuning document");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dest = %dest.display(), "document already absent");
            Ok(false)
        }
        Err(e) => Err(Error::Remove { dest: dest.to_path_buf(), source: e }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> =
            fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn installs_complete_document() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("999-net-bbr-fq.conf");

        install("net.core.rmem_max = 33554432\n", &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "net.core.rmem_max = 33554432\n");
        // No stray temp file left behind.
        assert_eq!(entries(dir.path()), vec![dest]);
    }

    #[test]
    fn replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("999-net-bbr-fq.conf");
        fs::write(&dest, "old content\n").unwrap();

        install("new content\n", &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new content\n");
    }

    #[test]
    fn rewrite_keeps_the_destination_mode() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("sysctl.conf");
        fs::write(&dest, "old content\n").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic("new content\n", &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new content\n");
        assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o644);
    }

    #[test]
    fn fresh_files_are_world_readable() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("999-net-bbr-fq.conf");

        install("net.core.rmem_max = 33554432\n", &dest).unwrap();

        assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o644);
    }

    #[test]
    fn publish_failure_leaves_destination_untouched() {
        let dir = tempdir().unwrap();
        // A non-empty directory at the destination path makes the rename
        // fail, regardless of the caller's privileges.
        let dest = dir.path().join("999-net-bbr-fq.conf");
        fs::create_dir(&dest).unwrap();
        let kept = dest.join("keep.txt");
        fs::write(&kept, "original\n").unwrap();

        let result = install("new content\n", &dest);

        assert!(matches!(result, Err(Error::Publish { .. })));
        assert_eq!(fs::read_to_string(&kept).unwrap(), "original\n");
        // The temp file was cleaned up on the failure path.
        assert_eq!(entries(dir.path()), vec![dest]);
    }

    #[test]
    fn stage_failure_when_parent_is_missing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing").join("999-net-bbr-fq.conf");

        assert!(matches!(install("content\n", &dest), Err(Error::Stage { .. })));
        assert!(!dest.exists());
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("999-net-bbr-fq.conf");
        fs::write(&dest, "content\n").unwrap();

        assert!(remove(&dest).unwrap());
        assert!(!dest.exists());
        assert!(!remove(&dest).unwrap());
    }
}
