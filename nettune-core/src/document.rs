//! Renders a [`BufferBudget`] into the sysctl document this tool installs.
//!
//! Rendering is deterministic: the same budget yields byte-identical text,
//! with the timestamp isolated on its own line so content comparisons can
//! ignore it. Keys keep a fixed canonical order (scheduler, buffers,
//! auxiliary) so diffs between runs stay minimal.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    budget::{BufferBudget, Profile, TuningInputs},
    registry::{Group, Tunable},
    tier::Tier,
};

/// An ordered `key = value` document plus provenance header, ready to be
/// written to the canonical target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    entries: Vec<(Tunable, String)>,
    text: String,
}

impl RenderedDocument {
    /// The rendered entries in document order.
    pub fn entries(&self) -> &[(Tunable, String)] {
        &self.entries
    }

    /// The complete file content.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render the document stamped with the current time.
pub fn render(inputs: &TuningInputs, tier: Tier, budget: &BufferBudget) -> RenderedDocument {
    render_at(inputs, tier, budget, Utc::now())
}

/// Render the document with an explicit timestamp.
pub fn render_at(
    inputs: &TuningInputs,
    tier: Tier,
    budget: &BufferBudget,
    timestamp: DateTime<Utc>,
) -> RenderedDocument {
    let aggressive = inputs.profile() == Profile::Aggressive;

    let entries: Vec<(Tunable, String)> = Tunable::ALL
        .iter()
        .filter(|tunable| aggressive || !tunable.aggressive_only())
        .map(|&tunable| (tunable, value_for(tunable, tier, budget)))
        .collect();

    let mut text = String::new();

    text.push_str(&format!(
        "# Managed by nettune v{}. Manual edits are overwritten on the next run.\n",
        env!("CARGO_PKG_VERSION")
    ));
    text.push_str(&format!(
        "# timestamp: {}\n",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    text.push_str(&format!(
        "# inputs: memory {:.2} GiB, bandwidth {} Mbit/s, rtt {:.1} ms, profile {}\n",
        inputs.memory_gib(),
        inputs.bandwidth_mbps(),
        inputs.rtt_ms(),
        inputs.profile(),
    ));
    text.push_str(&format!(
        "# bdp {} bytes, tier {}, bucket {} MiB\n",
        budget.bdp_bytes,
        tier.label(),
        budget.buffer_max_mib,
    ));

    let mut current_group: Option<Group> = None;
    for (tunable, value) in &entries {
        let group = tunable.group();
        if current_group != Some(group) {
            text.push_str(&format!("\n# {}\n", group.label()));
            current_group = Some(group);
        }
        text.push_str(&format!("{} = {}\n", tunable.key(), value));
    }

    RenderedDocument { entries, text }
}

/// The value rendered for one key. Buffer sizes come from the budget, UDP
/// minimums from the tier policy, the rest are fixed choices.
fn value_for(tunable: Tunable, tier: Tier, budget: &BufferBudget) -> String {
    let policy = tier.policy();

    match tunable {
        Tunable::DefaultQdisc => "fq".to_string(),
        Tunable::CongestionControl => "bbr".to_string(),
        Tunable::RmemDefault => budget.socket_default_read.to_string(),
        Tunable::WmemDefault => budget.socket_default_write.to_string(),
        Tunable::RmemMax | Tunable::WmemMax => budget.buffer_max_bytes.to_string(),
        Tunable::TcpRmem => budget.tcp_read.to_string(),
        Tunable::TcpWmem => budget.tcp_write.to_string(),
        Tunable::UdpRmemMin | Tunable::UdpWmemMin => policy.udp_min_bytes.to_string(),
        Tunable::OptmemMax => "65536".to_string(),
        Tunable::Somaxconn | Tunable::NetdevMaxBacklog => budget.queue_backlog.to_string(),
        Tunable::TcpMaxSynBacklog => budget.syn_backlog.to_string(),
        Tunable::IpLocalPortRange => "1024 65535".to_string(),
        Tunable::TcpFastopen => "3".to_string(),
        Tunable::TcpSlowStartAfterIdle => "0".to_string(),
        Tunable::TcpKeepaliveTime => "600".to_string(),
        Tunable::TcpKeepaliveIntvl => "10".to_string(),
        Tunable::TcpKeepaliveProbes => "6".to_string(),
        Tunable::TcpMaxTwBuckets => "2000000".to_string(),
        Tunable::TcpTwReuse
        | Tunable::TcpSyncookies
        | Tunable::TcpWindowScaling
        | Tunable::TcpTimestamps
        | Tunable::TcpSack
        | Tunable::TcpEcn
        | Tunable::TcpEcnFallback => "1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::budget::calculate;

    fn fixture(profile: Profile) -> (TuningInputs, Tier, BufferBudget) {
        let inputs = TuningInputs::new(4.0, 1000, 150.0, profile).unwrap();
        let budget = calculate(&inputs);
        (inputs, inputs.tier(), budget)
    }

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap()
    }

    #[test]
    fn rendering_is_deterministic() {
        let (inputs, tier, budget) = fixture(Profile::Conservative);

        let first = render_at(&inputs, tier, &budget, stamp());
        let second = render_at(&inputs, tier, &budget, stamp());

        assert_eq!(first.text(), second.text());
        assert_eq!(first.entries(), second.entries());
    }

    #[test]
    fn only_the_timestamp_line_varies() {
        let (inputs, tier, budget) = fixture(Profile::Conservative);

        let first = render_at(&inputs, tier, &budget, stamp());
        let later = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 1).unwrap();
        let second = render_at(&inputs, tier, &budget, later);

        assert_eq!(first.text().lines().count(), second.text().lines().count());
        let differing: Vec<(&str, &str)> = first
            .text()
            .lines()
            .zip(second.text().lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with("# timestamp:"));
    }

    #[test]
    fn scheduler_keys_come_first() {
        let (inputs, tier, budget) = fixture(Profile::Conservative);
        let document = render_at(&inputs, tier, &budget, stamp());

        let entries = document.entries();
        assert_eq!(entries[0].0, Tunable::DefaultQdisc);
        assert_eq!(entries[0].1, "fq");
        assert_eq!(entries[1].0, Tunable::CongestionControl);
        assert_eq!(entries[1].1, "bbr");
    }

    #[test]
    fn conservative_omits_aggressive_keys() {
        let (inputs, tier, budget) = fixture(Profile::Conservative);
        let document = render_at(&inputs, tier, &budget, stamp());

        assert!(document.entries().iter().all(|(tunable, _)| !tunable.aggressive_only()));
        assert!(!document.text().contains("net.ipv4.tcp_keepalive_time"));

        let (inputs, tier, budget) = fixture(Profile::Aggressive);
        let document = render_at(&inputs, tier, &budget, stamp());

        assert_eq!(document.entries().len(), Tunable::ALL.len());
        assert!(document.text().contains("net.ipv4.tcp_keepalive_time = 600"));
        assert!(document.text().contains("net.ipv4.tcp_max_tw_buckets = 2000000"));
    }

    #[test]
    fn every_assignment_line_is_an_owned_key() {
        let (inputs, tier, budget) = fixture(Profile::Aggressive);
        let document = render_at(&inputs, tier, &budget, stamp());

        for line in document.text().lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, _) = line.split_once(" = ").unwrap();
            assert!(Tunable::from_key(key).is_some(), "unowned key rendered: {key}");
        }
    }

    #[test]
    fn buffer_values_flow_into_the_text() {
        let inputs = TuningInputs::new(1.0, 500, 50.0, Profile::Conservative).unwrap();
        let budget = calculate(&inputs);
        let document = render_at(&inputs, inputs.tier(), &budget, stamp());

        assert!(document.text().contains("net.core.rmem_max = 4194304"));
        assert!(document.text().contains("net.ipv4.tcp_rmem = 4096 87380 4194304"));
        assert!(document.text().contains("net.ipv4.tcp_wmem = 4096 65536 4194304"));
        assert!(document.text().contains("net.ipv4.ip_local_port_range = 1024 65535"));
        assert!(document.text().contains("# bdp 3125000 bytes, tier 1-2 GiB, bucket 4 MiB"));
    }
}
