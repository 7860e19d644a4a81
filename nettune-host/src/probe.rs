//! Round-trip time probing.
//!
//! A short `ping` burst against a well-connected host gives the latency
//! figure the calculator needs. Probing is purely informational, so any
//! failure (no network, no ping binary, firewalled ICMP) degrades to a
//! documented fallback instead of failing the run.

use crate::command::Runner;

/// RTT assumed when the probe cannot produce a measurement.
pub const FALLBACK_RTT_MS: f64 = 50.0;

/// Measure the average RTT to `host` in milliseconds, or fall back to
/// [`FALLBACK_RTT_MS`].
pub fn measure_rtt_ms(host: &str) -> f64 {
    match try_measure(host) {
        Some(rtt_ms) => {
            tracing::info!(host, rtt_ms, "measured round-trip time");
            rtt_ms
        }
        None => {
            tracing::warn!(host, fallback = FALLBACK_RTT_MS, "rtt probe failed, using fallback");
            FALLBACK_RTT_MS
        }
    }
}

fn try_measure(host: &str) -> Option<f64> {
    let output = Runner::run("ping", &["-n", "-c", "3", "-W", "2", host]).ok()?;
    parse_avg_rtt(&output.stdout)
}

/// Extract the `avg` field from ping's summary line. Both layouts are seen
/// in the wild:
///
/// `rtt min/avg/max/mdev = 23.051/23.245/23.420/0.151 ms` (iputils)
/// `round-trip min/avg/max = 0.066/0.072/0.084 ms` (busybox)
fn parse_avg_rtt(stdout: &str) -> Option<f64> {
    let line = stdout.lines().find(|line| line.contains("min/avg/max"))?;
    let stats = line.split(" = ").nth(1)?;
    let avg = stats.split('/').nth(1)?;
    avg.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iputils_summary() {
        let stdout = "\
PING 1.1.1.1 (1.1.1.1) 56(84) bytes of data.
64 bytes from 1.1.1.1: icmp_seq=1 ttl=58 time=23.1 ms

--- 1.1.1.1 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 23.051/23.245/23.420/0.151 ms
";
        assert_eq!(parse_avg_rtt(stdout), Some(23.245));
    }

    #[test]
    fn parses_busybox_summary() {
        let stdout = "\
3 packets transmitted, 3 packets received, 0% packet loss
round-trip min/avg/max = 0.066/0.072/0.084 ms
";
        assert_eq!(parse_avg_rtt(stdout), Some(0.072));
    }

    #[test]
    fn rejects_output_without_a_summary() {
        assert_eq!(parse_avg_rtt("ping: connect: Network is unreachable\n"), None);
        assert_eq!(parse_avg_rtt(""), None);
    }
}
