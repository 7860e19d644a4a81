//! The sysctl configuration tree this tool operates on.
//!
//! The kernel loader merges `/etc/sysctl.conf` and a precedence list of
//! drop-in directories. Only `/etc` is within this tool's write authority;
//! the vendor directories are scanned but never mutated.

use std::path::{Path, PathBuf};

/// File name of the canonical artifact inside the drop-in directory. The
/// `999-` prefix sorts it last so it wins over other drop-ins.
pub const TARGET_FILE_NAME: &str = "999-net-bbr-fq.conf";

/// Paths of every location the conflict resolver covers.
///
/// [`ConfigTree::default`] is the real host layout. Tests build a tree under
/// a temporary root with [`ConfigTree::rooted_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTree {
    /// The monolithic configuration file, neutralized in place.
    pub sysctl_conf: PathBuf,
    /// The primary drop-in directory, where conflicting files are relocated.
    pub dropin_dir: PathBuf,
    /// Vendor- and runtime-owned drop-in directories, scanned read-only.
    pub readonly_dirs: Vec<PathBuf>,
    /// The canonical artifact this tool installs.
    pub target: PathBuf,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            sysctl_conf: PathBuf::from("/etc/sysctl.conf"),
            dropin_dir: PathBuf::from("/etc/sysctl.d"),
            readonly_dirs: vec![
                PathBuf::from("/run/sysctl.d"),
                PathBuf::from("/usr/local/lib/sysctl.d"),
                PathBuf::from("/usr/lib/sysctl.d"),
                PathBuf::from("/lib/sysctl.d"),
            ],
            target: Path::new("/etc/sysctl.d").join(TARGET_FILE_NAME),
        }
    }
}

impl ConfigTree {
    /// The default layout re-rooted under `root`, mirroring the real paths.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            sysctl_conf: root.join("etc/sysctl.conf"),
            dropin_dir: root.join("etc/sysctl.d"),
            readonly_dirs: vec![root.join("run/sysctl.d"), root.join("usr/lib/sysctl.d")],
            target: root.join("etc/sysctl.d").join(TARGET_FILE_NAME),
        }
    }
}
