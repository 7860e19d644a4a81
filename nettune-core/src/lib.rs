#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Pure derivation of kernel network tuning parameters.
//!
//! This crate owns the calculation pipeline: validated [`budget::TuningInputs`]
//! go through [`budget::calculate`] to produce a [`budget::BufferBudget`],
//! which [`document::render`] turns into the ordered sysctl document. No I/O
//! happens here; applying the document to a host lives in `nettune-host`.

pub mod budget;
pub mod document;
pub mod registry;
pub mod tier;

pub use budget::{calculate, BufferBudget, BufferTriple, InputError, Profile, TuningInputs};
pub use document::{render, render_at, RenderedDocument};
pub use registry::{Group, Tunable, PROC_SYS_ROOT};
pub use tier::{Tier, TierPolicy};

#[allow(non_upper_case_globals)]
pub mod constants {
    pub const KiB: u64 = 1024;
    pub const MiB: u64 = 1024 * KiB;
    pub const GiB: u64 = 1024 * MiB;
}
