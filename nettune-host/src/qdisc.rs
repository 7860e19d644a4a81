//! Queue discipline control for a network interface.
//!
//! `net.core.default_qdisc` only affects interfaces brought up after the
//! setting lands. Replacing the root qdisc with `tc` switches an already-up
//! interface immediately. Best effort: callers treat failure as a warning.

use crate::command::{self, Runner};

/// Install `fq` as the root qdisc of `interface`,
/// `tc qdisc replace dev <interface> root fq`.
pub fn install_fq(interface: &str) -> command::Result<command::Output> {
    tracing::info!(interface, "replacing root qdisc with fq");
    Runner::run("tc", &["qdisc", "replace", "dev", interface, "root", "fq"])
}
