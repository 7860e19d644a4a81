//! The fixed set of kernel network parameters this tool owns.
//!
//! Every key nettune is authorized to write lives here, as a variant of
//! [`Tunable`]. The conflict resolver matches files against the *whole* set,
//! regardless of the active profile: a conservative run still neutralizes a
//! stale aggressive-only assignment, because the key belongs to this tool
//! either way. Anything not in this set must never be touched.
//!
//! Each tunable knows three things:
//!
//! - its dotted sysctl name (`net.ipv4.tcp_congestion_control`), used in the
//!   rendered document and for matching lines in foreign files,
//! - its `/proc/sys` path, used to query the current effective value,
//! - its [`Group`], which fixes the canonical render order.

use std::path::{Path, PathBuf};

/// Root of the procfs sysctl tree.
pub const PROC_SYS_ROOT: &str = "/proc/sys";

/// Render group of a tunable. Groups are emitted in declaration order:
/// scheduler selection first, buffer sizing next, auxiliary knobs last, so
/// diffs between runs stay minimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    /// Congestion control and queue discipline selection.
    Scheduler,
    /// Socket and TCP/UDP buffer sizes.
    Buffers,
    /// Backlogs, port ranges, and protocol toggles.
    Auxiliary,
}

impl Group {
    /// Comment label used as the section marker in the rendered document.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduler => "scheduler",
            Self::Buffers => "buffers",
            Self::Auxiliary => "auxiliary",
        }
    }
}

/// A kernel network parameter owned by nettune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tunable {
    // Scheduler
    /// Default queue discipline for newly created interfaces.
    DefaultQdisc,
    /// TCP congestion control algorithm.
    CongestionControl,

    // Buffers
    /// Default receive buffer size for all socket types (bytes).
    RmemDefault,
    /// Default send buffer size for all socket types (bytes).
    WmemDefault,
    /// Maximum receive buffer size a socket may request (bytes).
    RmemMax,
    /// Maximum send buffer size a socket may request (bytes).
    WmemMax,
    /// TCP receive buffer sizes: "min default max" (bytes).
    TcpRmem,
    /// TCP send buffer sizes: "min default max" (bytes).
    TcpWmem,
    /// Minimum UDP receive buffer size (bytes).
    UdpRmemMin,
    /// Minimum UDP send buffer size (bytes).
    UdpWmemMin,
    /// Maximum ancillary buffer size per socket (bytes).
    OptmemMax,

    // Auxiliary
    /// Limit on the listen backlog of any socket.
    Somaxconn,
    /// Limit on queued connection requests still awaiting the final ACK.
    TcpMaxSynBacklog,
    /// Per-CPU backlog of packets received faster than the kernel drains them.
    NetdevMaxBacklog,
    /// Ephemeral port range as "low high".
    IpLocalPortRange,
    /// TCP Fast Open mode bitmap.
    TcpFastopen,
    /// Whether the congestion window collapses after an idle period.
    TcpSlowStartAfterIdle,

    // Auxiliary, aggressive profile only
    /// Seconds of idle before the first keepalive probe.
    TcpKeepaliveTime,
    /// Seconds between keepalive probes.
    TcpKeepaliveIntvl,
    /// Unanswered keepalive probes before the connection is dropped.
    TcpKeepaliveProbes,
    /// Reuse of TIME-WAIT sockets for outgoing connections.
    TcpTwReuse,
    /// Upper bound on simultaneous TIME-WAIT sockets.
    TcpMaxTwBuckets,
    /// SYN cookie behavior under backlog pressure.
    TcpSyncookies,
    /// RFC 1323 window scaling.
    TcpWindowScaling,
    /// RFC 1323 timestamps.
    TcpTimestamps,
    /// Selective acknowledgments.
    TcpSack,
    /// Explicit Congestion Notification mode.
    TcpEcn,
    /// Fallback to non-ECN on suspected ECN blackholing.
    TcpEcnFallback,
}

impl Tunable {
    /// Every owned tunable, in canonical render order.
    pub const ALL: &'static [Self] = &[
        Self::DefaultQdisc,
        Self::CongestionControl,
        Self::RmemDefault,
        Self::WmemDefault,
        Self::RmemMax,
        Self::WmemMax,
        Self::TcpRmem,
        Self::TcpWmem,
        Self::UdpRmemMin,
        Self::UdpWmemMin,
        Self::OptmemMax,
        Self::Somaxconn,
        Self::TcpMaxSynBacklog,
        Self::NetdevMaxBacklog,
        Self::IpLocalPortRange,
        Self::TcpFastopen,
        Self::TcpSlowStartAfterIdle,
        Self::TcpKeepaliveTime,
        Self::TcpKeepaliveIntvl,
        Self::TcpKeepaliveProbes,
        Self::TcpTwReuse,
        Self::TcpMaxTwBuckets,
        Self::TcpSyncookies,
        Self::TcpWindowScaling,
        Self::TcpTimestamps,
        Self::TcpSack,
        Self::TcpEcn,
        Self::TcpEcnFallback,
    ];

    /// The dotted sysctl name, as it appears in `sysctl.conf`-style files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::DefaultQdisc => "net.core.default_qdisc",
            Self::CongestionControl => "net.ipv4.tcp_congestion_control",
            Self::RmemDefault => "net.core.rmem_default",
            Self::WmemDefault => "net.core.wmem_default",
            Self::RmemMax => "net.core.rmem_max",
            Self::WmemMax => "net.core.wmem_max",
            Self::TcpRmem => "net.ipv4.tcp_rmem",
            Self::TcpWmem => "net.ipv4.tcp_wmem",
            Self::UdpRmemMin => "net.ipv4.udp_rmem_min",
            Self::UdpWmemMin => "net.ipv4.udp_wmem_min",
            Self::OptmemMax => "net.core.optmem_max",
            Self::Somaxconn => "net.core.somaxconn",
            Self::TcpMaxSynBacklog => "net.ipv4.tcp_max_syn_backlog",
            Self::NetdevMaxBacklog => "net.core.netdev_max_backlog",
            Self::IpLocalPortRange => "net.ipv4.ip_local_port_range",
            Self::TcpFastopen => "net.ipv4.tcp_fastopen",
            Self::TcpSlowStartAfterIdle => "net.ipv4.tcp_slow_start_after_idle",
            Self::TcpKeepaliveTime => "net.ipv4.tcp_keepalive_time",
            Self::TcpKeepaliveIntvl => "net.ipv4.tcp_keepalive_intvl",
            Self::TcpKeepaliveProbes => "net.ipv4.tcp_keepalive_probes",
            Self::TcpTwReuse => "net.ipv4.tcp_tw_reuse",
            Self::TcpMaxTwBuckets => "net.ipv4.tcp_max_tw_buckets",
            Self::TcpSyncookies => "net.ipv4.tcp_syncookies",
            Self::TcpWindowScaling => "net.ipv4.tcp_window_scaling",
            Self::TcpTimestamps => "net.ipv4.tcp_timestamps",
            Self::TcpSack => "net.ipv4.tcp_sack",
            Self::TcpEcn => "net.ipv4.tcp_ecn",
            Self::TcpEcnFallback => "net.ipv4.tcp_ecn_fallback",
        }
    }

    /// The `/proc/sys` path backing this tunable.
    ///
    /// Every key in the registry maps by replacing dots with slashes; none of
    /// the owned keys has a dot inside a path component.
    pub fn proc_path(&self) -> PathBuf {
        Path::new(PROC_SYS_ROOT).join(self.key().replace('.', "/"))
    }

    /// Render group of this tunable.
    pub fn group(&self) -> Group {
        match self {
            Self::DefaultQdisc | Self::CongestionControl => Group::Scheduler,
            Self::RmemDefault
            | Self::WmemDefault
            | Self::RmemMax
            | Self::WmemMax
            | Self::TcpRmem
            | Self::TcpWmem
            | Self::UdpRmemMin
            | Self::UdpWmemMin
            | Self::OptmemMax => Group::Buffers,
            _ => Group::Auxiliary,
        }
    }

    /// Whether this tunable is rendered only under the aggressive profile.
    ///
    /// The resolver still matches these keys on every run.
    pub fn aggressive_only(&self) -> bool {
        matches!(
            self,
            Self::TcpKeepaliveTime
                | Self::TcpKeepaliveIntvl
                | Self::TcpKeepaliveProbes
                | Self::TcpTwReuse
                | Self::TcpMaxTwBuckets
                | Self::TcpSyncookies
                | Self::TcpWindowScaling
                | Self::TcpTimestamps
                | Self::TcpSack
                | Self::TcpEcn
                | Self::TcpEcnFallback
        )
    }

    /// Look up a tunable by its exact dotted name.
    ///
    /// Exact comparison only: `net.ipv4.tcp_rmem` does not match a file key
    /// `net.ipv4.tcp_rmem_min`, and vice versa.
    pub fn from_key(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.key() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_paths_are_correct() {
        assert_eq!(
            Tunable::CongestionControl.proc_path(),
            Path::new("/proc/sys/net/ipv4/tcp_congestion_control")
        );
        assert_eq!(Tunable::DefaultQdisc.proc_path(), Path::new("/proc/sys/net/core/default_qdisc"));
        assert_eq!(Tunable::TcpRmem.proc_path(), Path::new("/proc/sys/net/ipv4/tcp_rmem"));
        assert_eq!(
            Tunable::NetdevMaxBacklog.proc_path(),
            Path::new("/proc/sys/net/core/netdev_max_backlog")
        );
    }

    #[test]
    fn all_is_ordered_by_group() {
        let groups: Vec<Group> = Tunable::ALL.iter().map(|t| t.group()).collect();
        let mut sorted = groups.clone();
        sorted.sort();
        assert_eq!(groups, sorted, "Tunable::ALL must be grouped scheduler, buffers, auxiliary");
    }

    #[test]
    fn all_keys_are_unique() {
        for (i, a) in Tunable::ALL.iter().enumerate() {
            for b in &Tunable::ALL[i + 1..] {
                assert_ne!(a.key(), b.key());
            }
        }
    }

    #[test]
    fn from_key_is_exact() {
        assert_eq!(Tunable::from_key("net.ipv4.tcp_rmem"), Some(Tunable::TcpRmem));
        assert_eq!(Tunable::from_key("net.ipv4.tcp_rmem_min"), None);
        assert_eq!(Tunable::from_key("net.ipv4.tcp_r"), None);
        assert_eq!(Tunable::from_key(""), None);
    }

    #[test]
    fn aggressive_only_keys_sit_in_auxiliary() {
        for t in Tunable::ALL {
            if t.aggressive_only() {
                assert_eq!(t.group(), Group::Auxiliary, "{} misplaced", t.key());
            }
        }
    }
}
