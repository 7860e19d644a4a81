#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Kernel network tuning for Linux hosts.
//!
//! Sizes TCP and UDP buffers from the link's bandwidth-delay product, takes
//! exclusive ownership of the tuned sysctl keys, and installs a single
//! drop-in under `/etc/sysctl.d`. The library surface exists so the install
//! pipeline can be driven against a relocated config tree in tests.

pub mod cli;
pub mod run;
