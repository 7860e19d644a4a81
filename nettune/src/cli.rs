//! Command-line surface and input gathering.

use std::io::{self, Write};

use clap::Parser;
use nettune_core::budget::{InputError, Profile, TuningInputs};
use nettune_host::{meminfo, probe};

/// Bandwidth assumed when no override is given. Links faster than this are
/// common, but the conservative calculation is bounded by RAM anyway.
pub const DEFAULT_BANDWIDTH_MBPS: u64 = 1000;

#[derive(Debug, Parser)]
#[command(name = "nettune", version)]
#[command(about = "BDP-based kernel network tuning for Linux hosts")]
pub struct Args {
    /// Host memory in GiB (default: detected from /proc/meminfo)
    #[arg(long)]
    pub memory: Option<f64>,

    /// Link bandwidth in Mbit/s (default: 1000)
    #[arg(long)]
    pub bandwidth: Option<u64>,

    /// Round-trip time in milliseconds (default: measured with ping)
    #[arg(long)]
    pub rtt: Option<f64>,

    /// Size buffers for throughput over memory economy
    #[arg(long)]
    pub aggressive: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Report conflicts and print the document without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Remove the installed configuration and reload the rest
    #[arg(long)]
    pub uninstall: bool,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    /// Also replace the root qdisc on this interface
    #[arg(long)]
    pub interface: Option<String>,

    /// Host pinged to measure the round-trip time
    #[arg(long, default_value = "1.1.1.1")]
    pub probe_host: String,
}

impl Args {
    pub fn profile(&self) -> Profile {
        if self.aggressive {
            Profile::Aggressive
        } else {
            Profile::Conservative
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid inputs: {0}")]
    Input(#[from] InputError),

    #[error("memory detection failed: {0}")]
    Memory(#[from] meminfo::Error),
}

/// Assemble validated [`TuningInputs`], detecting or probing whatever the
/// flags leave open. With all three overrides given this touches nothing
/// outside the process.
pub fn gather_inputs(args: &Args) -> Result<TuningInputs, Error> {
    let memory_gib = match args.memory {
        Some(memory_gib) => memory_gib,
        None => meminfo::detect_memory_gib()?,
    };

    let bandwidth_mbps = match args.bandwidth {
        Some(bandwidth_mbps) => bandwidth_mbps,
        None => {
            tracing::info!(assumed = DEFAULT_BANDWIDTH_MBPS, "no bandwidth given, assuming 1 Gbit/s");
            DEFAULT_BANDWIDTH_MBPS
        }
    };

    let rtt_ms = match args.rtt {
        Some(rtt_ms) => rtt_ms,
        None => probe::measure_rtt_ms(&args.probe_host),
    };

    let inputs = TuningInputs::new(memory_gib, bandwidth_mbps, rtt_ms, args.profile())?;
    tracing::debug!(?inputs, "gathered tuning inputs");

    Ok(inputs)
}

/// A single y/N gate before the host is touched.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim();

    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let args = Args::parse_from(["nettune"]);
        assert_eq!(args.memory, None);
        assert_eq!(args.bandwidth, None);
        assert_eq!(args.rtt, None);
        assert!(!args.aggressive);
        assert!(!args.yes);
        assert!(!args.dry_run);
        assert!(!args.uninstall);
        assert_eq!(args.interface, None);
        assert_eq!(args.probe_host, "1.1.1.1");
        assert_eq!(args.profile(), Profile::Conservative);
    }

    #[test]
    fn parse_full_overrides() {
        let args = Args::parse_from([
            "nettune",
            "--memory",
            "8",
            "--bandwidth",
            "2500",
            "--rtt",
            "12.5",
            "--aggressive",
            "-y",
            "--interface",
            "eth0",
            "--probe-host",
            "10.0.0.1",
        ]);
        assert_eq!(args.memory, Some(8.0));
        assert_eq!(args.bandwidth, Some(2500));
        assert_eq!(args.rtt, Some(12.5));
        assert!(args.yes);
        assert_eq!(args.interface.as_deref(), Some("eth0"));
        assert_eq!(args.probe_host, "10.0.0.1");
        assert_eq!(args.profile(), Profile::Aggressive);
    }

    #[test]
    fn explicit_overrides_gather_without_probing() {
        let args = Args::parse_from(["nettune", "--memory", "4", "--bandwidth", "1000", "--rtt", "20"]);
        let inputs = gather_inputs(&args).unwrap();
        assert_eq!(inputs.memory_gib(), 4.0);
        assert_eq!(inputs.bandwidth_mbps(), 1000);
        assert_eq!(inputs.rtt_ms(), 20.0);
    }

    #[test]
    fn out_of_range_overrides_are_rejected() {
        let args = Args::parse_from(["nettune", "--memory", "4", "--bandwidth", "0", "--rtt", "20"]);
        assert!(matches!(gather_inputs(&args), Err(Error::Input(InputError::Bandwidth(0)))));
    }
}
