#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Filesystem and kernel interfaces for nettune.
//!
//! Everything with a side effect lives here: the conflict [`resolver`], the
//! transactional [`install`] step, and the subprocess-backed collaborators
//! ([`sysctl`], [`probe`], [`qdisc`]). All operations are synchronous; the
//! tool makes one pass over a bounded set of files and exits.

pub mod command;
pub mod install;
pub mod layout;
pub mod meminfo;
pub mod probe;
pub mod qdisc;
pub mod resolver;
pub mod sysctl;

pub use layout::{ConfigTree, TARGET_FILE_NAME};
pub use resolver::{Conflict, KeyMatch, Resolver};
