//! Kernel sysctl interface.
//!
//! Settings are applied through the `sysctl` binary so the kernel performs
//! its own parsing and validation, and queried back by reading the key's
//! `/proc/sys` file directly. Reads work unprivileged; applying requires
//! root.

use std::{io, path::Path};

use nettune_core::registry::Tunable;

use crate::command::{self, Runner};

/// Apply every assignment in a configuration file, `sysctl -p <path>`.
pub fn apply_file(path: &Path) -> command::Result<command::Output> {
    tracing::info!(path = %path.display(), "applying sysctl settings");
    Runner::run("sysctl", &["-p", &path.to_string_lossy()])
}

/// Reload the whole configuration tree in precedence order,
/// `sysctl --system`. Used after uninstall so the remaining files take
/// effect again.
pub fn apply_system() -> command::Result<command::Output> {
    tracing::info!("reapplying system sysctl configuration");
    Runner::run("sysctl", &["--system"])
}

/// Current effective value of an owned key, trimmed.
pub fn current(tunable: Tunable) -> io::Result<String> {
    std::fs::read_to_string(tunable.proc_path()).map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_reads_live_values() {
        // /proc/sys is always mounted on Linux; the value itself varies.
        let value = current(Tunable::CongestionControl).unwrap();
        assert!(!value.is_empty());
    }
}
