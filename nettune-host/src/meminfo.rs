//! Host memory detection.

use std::io;

/// Path to the kernel's memory statistics.
pub const MEMINFO_PATH: &str = "/proc/meminfo";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {MEMINFO_PATH}: {0}")]
    Read(#[from] io::Error),

    #[error("no parsable MemTotal line in {MEMINFO_PATH}")]
    Malformed,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Total host memory in GiB, from the `MemTotal` line of `/proc/meminfo`.
pub fn detect_memory_gib() -> Result<f64> {
    let contents = std::fs::read_to_string(MEMINFO_PATH)?;
    let memory_gib = parse_mem_total_gib(&contents)?;

    tracing::debug!(memory_gib, "read {MEMINFO_PATH}");

    Ok(memory_gib)
}

/// Parse `MemTotal:       16384256 kB` into GiB. The kernel's `kB` unit is
/// actually KiB.
fn parse_mem_total_gib(contents: &str) -> Result<f64> {
    let line =
        contents.lines().find(|line| line.starts_with("MemTotal:")).ok_or(Error::Malformed)?;
    let kib: u64 = line
        .split_whitespace()
        .nth(1)
        .ok_or(Error::Malformed)?
        .parse()
        .map_err(|_| Error::Malformed)?;

    Ok(kib as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_total() {
        let contents = "\
MemTotal:        4194304 kB
MemFree:          123456 kB
MemAvailable:     234567 kB
";
        assert_eq!(parse_mem_total_gib(contents).unwrap(), 4.0);
    }

    #[test]
    fn rejects_malformed_contents() {
        assert!(matches!(parse_mem_total_gib("MemFree: 1 kB\n"), Err(Error::Malformed)));
        assert!(matches!(parse_mem_total_gib("MemTotal: lots\n"), Err(Error::Malformed)));
        assert!(matches!(parse_mem_total_gib(""), Err(Error::Malformed)));
    }

    #[test]
    fn detects_live_memory() {
        // /proc/meminfo is always present on Linux.
        assert!(detect_memory_gib().unwrap() > 0.0);
    }
}
