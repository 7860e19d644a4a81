//! Memory-bracketed sizing policy.
//!
//! A single global policy under-serves small hosts and over-commits large
//! ones, so the aggressive calculation selects its rails from this table.

use crate::constants::{KiB, MiB};

/// Sizing constants for one memory bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPolicy {
    /// Lower clamp for the aggressive buffer cap (bytes).
    pub min_buffer_bytes: u64,
    /// Upper clamp for the aggressive buffer cap (bytes).
    pub cap_buffer_bytes: u64,
    /// Fraction of total RAM the aggressive candidate may claim.
    pub ram_fraction: f64,
    /// Default socket receive buffer (bytes).
    pub default_read_bytes: u64,
    /// Default socket send buffer (bytes).
    pub default_write_bytes: u64,
    /// Minimum UDP buffer size (bytes).
    pub udp_min_bytes: u64,
}

/// Memory bracket of the host, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Less than 1 GiB of RAM.
    Small,
    /// 1 GiB up to (but not including) 2 GiB.
    Medium,
    /// 2 GiB or more.
    Large,
}

const SMALL: TierPolicy = TierPolicy {
    min_buffer_bytes: 4 * MiB,
    cap_buffer_bytes: 16 * MiB,
    ram_fraction: 0.02,
    default_read_bytes: 128 * KiB,
    default_write_bytes: 128 * KiB,
    udp_min_bytes: 4 * KiB,
};

const MEDIUM: TierPolicy = TierPolicy {
    min_buffer_bytes: 8 * MiB,
    cap_buffer_bytes: 32 * MiB,
    ram_fraction: 0.03,
    default_read_bytes: 256 * KiB,
    default_write_bytes: 256 * KiB,
    udp_min_bytes: 8 * KiB,
};

const LARGE: TierPolicy = TierPolicy {
    min_buffer_bytes: 16 * MiB,
    cap_buffer_bytes: 64 * MiB,
    ram_fraction: 0.04,
    default_read_bytes: 512 * KiB,
    default_write_bytes: 512 * KiB,
    udp_min_bytes: 16 * KiB,
};

impl Tier {
    /// Select the bracket for a host with `memory_gib` of RAM.
    pub fn select(memory_gib: f64) -> Self {
        if memory_gib < 1.0 {
            Self::Small
        } else if memory_gib < 2.0 {
            Self::Medium
        } else {
            Self::Large
        }
    }

    /// The sizing constants of this bracket.
    pub fn policy(&self) -> &'static TierPolicy {
        match self {
            Self::Small => &SMALL,
            Self::Medium => &MEDIUM,
            Self::Large => &LARGE,
        }
    }

    /// Human-readable bracket bounds, used in provenance comments.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Small => "<1 GiB",
            Self::Medium => "1-2 GiB",
            Self::Large => ">=2 GiB",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_boundaries() {
        assert_eq!(Tier::select(0.0), Tier::Small);
        assert_eq!(Tier::select(0.99), Tier::Small);
        assert_eq!(Tier::select(1.0), Tier::Medium);
        assert_eq!(Tier::select(1.99), Tier::Medium);
        assert_eq!(Tier::select(2.0), Tier::Large);
        assert_eq!(Tier::select(512.0), Tier::Large);
    }

    #[test]
    fn rails_widen_with_memory() {
        let (s, m, l) = (Tier::Small.policy(), Tier::Medium.policy(), Tier::Large.policy());
        assert!(s.cap_buffer_bytes < m.cap_buffer_bytes);
        assert!(m.cap_buffer_bytes < l.cap_buffer_bytes);
        assert!(s.min_buffer_bytes <= s.cap_buffer_bytes);
        assert!(m.min_buffer_bytes <= m.cap_buffer_bytes);
        assert!(l.min_buffer_bytes <= l.cap_buffer_bytes);
    }
}
