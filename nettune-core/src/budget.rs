//! The tuning parameter calculator.
//!
//! Buffer sizing starts from the bandwidth-delay product: the amount of data
//! a connection can have in flight during one round trip. A socket buffer
//! smaller than the BDP caps throughput below the link rate, while one much
//! larger than it only adds memory pressure and queueing delay. The
//! calculator derives a buffer cap from the BDP and then bounds it with
//! RAM-fraction and tier rails so pathological inputs (terrestrial bandwidth
//! with satellite latency on a 512 MiB host) cannot produce unbounded sizes.
//!
//! Everything in this module is pure. Inputs are validated once at
//! construction and the calculation itself has no error path.

use std::fmt;

use crate::{
    constants::{GiB, MiB},
    tier::Tier,
};

/// Fraction of total RAM the conservative candidate may claim.
const CONSERVATIVE_RAM_FRACTION: f64 = 0.03;

/// Hard ceiling for the conservative candidate, the top of the bucket ladder.
const CONSERVATIVE_CEILING_BYTES: u64 = 64 * MiB;

/// The fixed bucket ladder, largest first. Conservative candidates are
/// rounded down onto this ladder and the backlog table is keyed by it.
const BUCKET_LADDER_MIB: [u64; 5] = [64, 32, 16, 8, 4];

/// Errors raised when constructing [`TuningInputs`] from raw values.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("memory size must be a non-negative, finite number of GiB, got {0}")]
    Memory(f64),

    #[error("bandwidth must be at least 1 Mbit/s, got {0}")]
    Bandwidth(u64),

    #[error("rtt must be a non-negative, finite number of milliseconds, got {0}")]
    Rtt(f64),
}

/// How far the derived settings lean on the host's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// BDP-bounded sizing with a hard 64 MiB ceiling. The default.
    #[default]
    Conservative,
    /// Larger buffers plus extra TCP latency/throughput knobs, clamped to
    /// the memory tier's rails.
    Aggressive,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// The three measurements the calculation runs on, plus the chosen profile.
///
/// Validated on construction and immutable afterwards, so the calculator
/// itself has no error path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningInputs {
    memory_gib: f64,
    bandwidth_mbps: u64,
    rtt_ms: f64,
    profile: Profile,
}

impl TuningInputs {
    /// Validate raw values into a usable input set.
    pub fn new(
        memory_gib: f64,
        bandwidth_mbps: u64,
        rtt_ms: f64,
        profile: Profile,
    ) -> Result<Self, InputError> {
        if !memory_gib.is_finite() || memory_gib < 0.0 {
            return Err(InputError::Memory(memory_gib));
        }

        if bandwidth_mbps < 1 {
            return Err(InputError::Bandwidth(bandwidth_mbps));
        }

        if !rtt_ms.is_finite() || rtt_ms < 0.0 {
            return Err(InputError::Rtt(rtt_ms));
        }

        Ok(Self { memory_gib, bandwidth_mbps, rtt_ms, profile })
    }

    /// Host memory in GiB.
    #[inline]
    pub fn memory_gib(&self) -> f64 {
        self.memory_gib
    }

    /// Link bandwidth in Mbit/s.
    #[inline]
    pub fn bandwidth_mbps(&self) -> u64 {
        self.bandwidth_mbps
    }

    /// Round-trip time in milliseconds.
    #[inline]
    pub fn rtt_ms(&self) -> f64 {
        self.rtt_ms
    }

    /// The selected sizing profile.
    #[inline]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// The memory tier this host falls into.
    #[inline]
    pub fn tier(&self) -> Tier {
        Tier::select(self.memory_gib)
    }
}

/// A `(min, default, max)` kernel buffer triplet, rendered space-separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTriple {
    pub min: u64,
    pub default: u64,
    pub max: u64,
}

impl fmt::Display for BufferTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.min, self.default, self.max)
    }
}

/// Every derived size the renderer needs, in bytes.
///
/// `buffer_max_bytes` never exceeds the profile's ceiling: the 64 MiB ladder
/// top in conservative mode, the tier's `cap_buffer_bytes` in aggressive
/// mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBudget {
    /// Bandwidth-delay product of the link, rounded half-up.
    pub bdp_bytes: u64,
    /// The derived value for `rmem_max`/`wmem_max`.
    pub buffer_max_bytes: u64,
    /// `buffer_max_bytes` expressed as its ladder bucket, in MiB.
    pub buffer_max_mib: u64,
    /// `tcp_rmem` triplet.
    pub tcp_read: BufferTriple,
    /// `tcp_wmem` triplet.
    pub tcp_write: BufferTriple,
    /// Default socket receive buffer (`rmem_default`).
    pub socket_default_read: u64,
    /// Default socket send buffer (`wmem_default`).
    pub socket_default_write: u64,
    /// Accept queue and device backlog length.
    pub queue_backlog: u64,
    /// Half-open connection queue length.
    pub syn_backlog: u64,
}

/// Derive the full buffer budget from validated inputs.
///
/// Conservative mode takes `min(2 * bdp, 3% of RAM, 64 MiB)` and rounds it
/// down onto the bucket ladder, never below 4 MiB. Aggressive mode takes
/// `max(4 * bdp, tier RAM fraction)` and clamps it into the tier's
/// `[min_buffer, cap_buffer]` rails, low end first.
pub fn calculate(inputs: &TuningInputs) -> BufferBudget {
    let bdp_bytes = (inputs.bandwidth_mbps() as f64 * 125.0 * inputs.rtt_ms()).round() as u64;

    let tier = inputs.tier();
    let policy = tier.policy();
    let memory_bytes = inputs.memory_gib() * GiB as f64;

    let buffer_max_bytes = match inputs.profile() {
        Profile::Conservative => {
            let candidate = (2.0 * bdp_bytes as f64)
                .min(CONSERVATIVE_RAM_FRACTION * memory_bytes)
                .min(CONSERVATIVE_CEILING_BYTES as f64);

            bucket_mib(candidate) * MiB
        }
        Profile::Aggressive => {
            let candidate = (4.0 * bdp_bytes as f64).max(policy.ram_fraction * memory_bytes);

            // Clip into the tier rails, low end first.
            (candidate.round() as u64).clamp(policy.min_buffer_bytes, policy.cap_buffer_bytes)
        }
    };

    let buffer_max_mib = bucket_mib(buffer_max_bytes as f64);
    let (queue_backlog, syn_backlog) = backlog_for(buffer_max_mib);

    BufferBudget {
        bdp_bytes,
        buffer_max_bytes,
        buffer_max_mib,
        tcp_read: BufferTriple { min: 4096, default: 87380, max: buffer_max_bytes },
        tcp_write: BufferTriple { min: 4096, default: 65536, max: buffer_max_bytes },
        socket_default_read: policy.default_read_bytes,
        socket_default_write: policy.default_write_bytes,
        queue_backlog,
        syn_backlog,
    }
}

/// Round a byte count down onto the bucket ladder: the largest ladder value
/// not above the candidate's MiB count, floored at 4 MiB.
fn bucket_mib(candidate_bytes: f64) -> u64 {
    let candidate_mib = candidate_bytes / MiB as f64;

    BUCKET_LADDER_MIB.into_iter().find(|&bucket| bucket as f64 <= candidate_mib).unwrap_or(4)
}

/// Backlog sizes keyed on the buffer bucket. Fixed lookup rather than a BDP
/// derivation: backlog pressure tracks expected connection volume, not link
/// capacity.
fn backlog_for(bucket_mib: u64) -> (u64, u64) {
    match bucket_mib {
        4 => (2500, 2048),
        8 => (5000, 4096),
        16 => (10_000, 8192),
        32 => (20_000, 8192),
        _ => (30_000, 16_384),
    }
}
