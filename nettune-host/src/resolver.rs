//! The configuration conflict resolver.
//!
//! Before the new document is installed, every location the kernel loader
//! reads must be cleared of active assignments to owned keys, or the freshly
//! applied settings would be shadowed on the next `sysctl --system`. Three
//! operations cover the tree, in precedence order:
//!
//! - [`Resolver::neutralize_file`] comments out matching lines in the
//!   monolithic `/etc/sysctl.conf`, after copying the whole file to a backup.
//! - [`Resolver::relocate_dir`] renames whole conflicting files out of the
//!   primary drop-in directory. Drop-ins are managed as units, so they are
//!   moved rather than edited.
//! - [`Resolver::scan_dir`] reports conflicts in vendor-owned directories
//!   without mutating anything.
//!
//! Nothing is ever permanently discarded: originals survive as timestamped
//! `.bak-` siblings, which the loader ignores since it only reads `*.conf`.

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::Local;
use nettune_core::registry::Tunable;

use crate::install;

/// Attempts before giving up on finding an unused backup name.
const MAX_BACKUP_ATTEMPTS: u32 = 1000;

/// Strftime layout of the backup stamp, second granularity.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to back up {path} to {backup}: {source}")]
    Backup { path: PathBuf, backup: PathBuf, source: io::Error },

    #[error("failed to relocate {path} to {backup}: {source}")]
    Relocate { path: PathBuf, backup: PathBuf, source: io::Error },

    #[error("failed to rewrite {path}: {source}")]
    Rewrite { path: PathBuf, source: install::Error },

    #[error("failed to list {path}: {source}")]
    List { path: PathBuf, source: io::Error },

    #[error("no unused backup name for {0}")]
    BackupNames(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

/// An active assignment to an owned key, located by line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch {
    /// 1-based line number in the scanned file.
    pub line_no: usize,
    /// The owned key the line assigns.
    pub tunable: Tunable,
}

/// One file holding active assignments to owned keys, and what became of it.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The file as it was found.
    pub path: PathBuf,
    /// Every matching line.
    pub matches: Vec<KeyMatch>,
    /// Where the original content now lives: the backup copy for a
    /// neutralized file, the new location for a relocated one. `None` when
    /// nothing was written (dry run or report-only scan).
    pub backup: Option<PathBuf>,
}

/// Scans and clears the configuration tree of conflicting assignments.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    dry_run: bool,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// In dry-run mode every operation reports identically but writes
    /// nothing.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Neutralize the monolithic configuration file in place.
    ///
    /// Matching lines are commented out; everything else is preserved
    /// verbatim. The original file is copied to a timestamped backup first,
    /// and the rewrite goes through the installer's write-temp-then-rename
    /// path so no reader ever observes a half-rewritten file. A missing or
    /// clean file is left completely untouched, and the scan reads lossily
    /// so a stray non-UTF-8 byte never aborts the run.
    pub fn neutralize_file(&self, path: &Path) -> Result<Option<Conflict>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no monolithic file present");
                return Ok(None);
            }
            Err(e) => return Err(Error::Read { path: path.to_path_buf(), source: e }),
        };
        let content = String::from_utf8_lossy(&bytes);

        let matches = scan_content(&content);
        if matches.is_empty() {
            tracing::debug!(path = %path.display(), "no conflicting assignments");
            return Ok(None);
        }

        if self.dry_run {
            tracing::info!(
                path = %path.display(),
                keys = matches.len(),
                "would neutralize conflicting assignments"
            );
            return Ok(Some(Conflict { path: path.to_path_buf(), matches, backup: None }));
        }

        let backup = fresh_backup_path(path, &Local::now().format(BACKUP_STAMP_FORMAT).to_string())?;
        std::fs::copy(path, &backup).map_err(|e| Error::Backup {
            path: path.to_path_buf(),
            backup: backup.clone(),
            source: e,
        })?;

        let neutralized = neutralize_content(&content);
        install::write_atomic(&neutralized, path)
            .map_err(|e| Error::Rewrite { path: path.to_path_buf(), source: e })?;

        tracing::info!(
            path = %path.display(),
            backup = %backup.display(),
            keys = matches.len(),
            "neutralized conflicting assignments"
        );

        Ok(Some(Conflict { path: path.to_path_buf(), matches, backup: Some(backup) }))
    }

    /// Relocate conflicting drop-in files out of the active set.
    ///
    /// Every `*.conf` file in `dir` holding a match is renamed to a
    /// timestamped `.bak-` sibling, which the loader does not read. The
    /// canonical target is skipped, compared by resolved real path so a
    /// symlink alias cannot slip through.
    pub fn relocate_dir(&self, dir: &Path, canonical_target: &Path) -> Result<Vec<Conflict>> {
        let target_real = canonical_target.canonicalize().ok();
        let mut conflicts = Vec::new();

        for path in conf_entries(dir)? {
            let Ok(real) = path.canonicalize() else {
                continue;
            };
            if Some(&real) == target_real.as_ref() {
                tracing::debug!(path = %path.display(), "skipping own canonical target");
                continue;
            }

            let bytes = std::fs::read(&path)
                .map_err(|e| Error::Read { path: path.clone(), source: e })?;
            let matches = scan_content(&String::from_utf8_lossy(&bytes));
            if matches.is_empty() {
                continue;
            }

            if self.dry_run {
                tracing::info!(path = %path.display(), keys = matches.len(), "would relocate drop-in");
                conflicts.push(Conflict { path, matches, backup: None });
                continue;
            }

            let backup =
                fresh_backup_path(&path, &Local::now().format(BACKUP_STAMP_FORMAT).to_string())?;
            std::fs::rename(&path, &backup).map_err(|e| Error::Relocate {
                path: path.clone(),
                backup: backup.clone(),
                source: e,
            })?;

            tracing::info!(
                path = %path.display(),
                backup = %backup.display(),
                keys = matches.len(),
                "relocated conflicting drop-in"
            );

            conflicts.push(Conflict { path, matches, backup: Some(backup) });
        }

        Ok(conflicts)
    }

    /// Report conflicts in a directory outside this tool's write authority.
    /// Never mutates, regardless of dry-run mode.
    pub fn scan_dir(&self, dir: &Path) -> Result<Vec<Conflict>> {
        let mut conflicts = Vec::new();

        for path in conf_entries(dir)? {
            let bytes = std::fs::read(&path)
                .map_err(|e| Error::Read { path: path.clone(), source: e })?;
            let matches = scan_content(&String::from_utf8_lossy(&bytes));
            if matches.is_empty() {
                continue;
            }

            tracing::warn!(
                path = %path.display(),
                keys = matches.len(),
                "conflicting assignments in read-only path, not modified"
            );

            conflicts.push(Conflict { path, matches, backup: None });
        }

        Ok(conflicts)
    }
}

/// The `*.conf` regular files of a directory, sorted. A missing directory is
/// an empty list.
fn conf_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %dir.display(), "directory not present");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::List { path: dir.to_path_buf(), source: e }),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::List { path: dir.to_path_buf(), source: e })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "conf") {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths)
}

/// Scan text for active assignments to owned keys.
pub fn scan_content(content: &str) -> Vec<KeyMatch> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            match_line(line).map(|tunable| KeyMatch { line_no: idx + 1, tunable })
        })
        .collect()
}

/// The owned key a line actively assigns, if any. Comment and blank lines
/// never match; otherwise the token before the first `=` must equal an owned
/// key exactly.
fn match_line(line: &str) -> Option<Tunable> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }

    let (key, _) = trimmed.split_once('=')?;
    Tunable::from_key(key.trim())
}

/// Comment out every matching line, preserving all others byte for byte.
///
/// Lines are split inclusively so CRLF endings and a missing final newline
/// survive the rewrite untouched.
fn neutralize_content(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 64);
    for line in content.split_inclusive('\n') {
        if match_line(line).is_some() {
            out.push('#');
        }
        out.push_str(line);
    }
    out
}

/// First unused `<name>.bak-<stamp>` sibling, disambiguated with a counter
/// when repeated runs land in the same second.
fn fresh_backup_path(path: &Path, stamp: &str) -> Result<PathBuf> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    for attempt in 0..MAX_BACKUP_ATTEMPTS {
        let candidate = if attempt == 0 {
            path.with_file_name(format!("{name}.bak-{stamp}"))
        } else {
            path.with_file_name(format!("{name}.bak-{stamp}-{attempt}"))
        };
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::BackupNames(path.to_path_buf()))
}
