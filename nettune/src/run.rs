//! End-to-end orchestration: resolve conflicts, calculate, render, install,
//! apply, verify.

use std::io;

use nettune_core::{
    budget::TuningInputs,
    document::{render, RenderedDocument},
    registry::Tunable,
};
use nettune_host::{install, qdisc, resolver, sysctl, ConfigTree, Resolver};

use crate::cli::{self, Args};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("root privileges are required, rerun with sudo")]
    NotRoot,

    #[error(transparent)]
    Gather(#[from] cli::Error),

    #[error("conflict resolution failed: {0}")]
    Resolve(#[from] resolver::Error),

    #[error("install failed: {0}")]
    Install(#[from] install::Error),

    #[error("prompt failed: {0}")]
    Confirm(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn ensure_root() -> Result<()> {
    if nix::unistd::geteuid().is_root() {
        Ok(())
    } else {
        Err(Error::NotRoot)
    }
}

/// Walk every location the kernel loads sysctl settings from and get our
/// keys out of the way: neutralize the monolithic file, relocate drop-ins,
/// report what sits in read-only paths.
fn resolve_conflicts(tree: &ConfigTree, dry_run: bool) -> Result<()> {
    let resolver = Resolver::new().with_dry_run(dry_run);

    let mut resolved = 0;
    if resolver.neutralize_file(&tree.sysctl_conf)?.is_some() {
        resolved += 1;
    }
    resolved += resolver.relocate_dir(&tree.dropin_dir, &tree.target)?.len();

    let mut reported = 0;
    for dir in &tree.readonly_dirs {
        reported += resolver.scan_dir(dir)?.len();
    }

    tracing::info!(resolved, reported, "conflict resolution complete");
    Ok(())
}

/// Render the document this host would receive, resolving in dry-run mode so
/// nothing on disk changes. Needs no privileges.
pub fn preview(inputs: &TuningInputs, tree: &ConfigTree) -> Result<RenderedDocument> {
    resolve_conflicts(tree, true)?;

    let budget = nettune_core::calculate(inputs);
    Ok(render(inputs, inputs.tier(), &budget))
}

/// Resolve conflicts for real, then render and install the document at the
/// tree's target path. Stops short of poking the kernel so callers decide
/// when, or whether, the settings go live.
pub fn prepare_and_install(inputs: &TuningInputs, tree: &ConfigTree) -> Result<RenderedDocument> {
    resolve_conflicts(tree, false)?;

    let budget = nettune_core::calculate(inputs);
    let document = render(inputs, inputs.tier(), &budget);
    install::install(document.text(), &tree.target)?;

    Ok(document)
}

/// Load the installed file into the kernel and read every value back.
/// Failures here are warnings: the document is already on disk and will be
/// picked up on the next boot either way.
fn apply_and_verify(tree: &ConfigTree, document: &RenderedDocument) {
    if let Err(e) = sysctl::apply_file(&tree.target) {
        tracing::warn!("sysctl apply failed, settings load on next boot: {e}");
        return;
    }

    let mut mismatches = 0;
    for (tunable, wanted) in document.entries() {
        let actual = match sysctl::current(*tunable) {
            Ok(actual) => actual,
            Err(e) => {
                tracing::warn!(key = tunable.key(), "could not read live value: {e}");
                mismatches += 1;
                continue;
            }
        };

        // The kernel prints triples tab-separated, the document uses spaces.
        if actual.split_whitespace().eq(wanted.split_whitespace()) {
            continue;
        }

        mismatches += 1;
        if *tunable == Tunable::CongestionControl {
            tracing::warn!(
                wanted = wanted.as_str(),
                actual = actual.as_str(),
                "congestion control not applied, is the tcp_bbr module loaded?"
            );
        } else {
            tracing::warn!(
                key = tunable.key(),
                wanted = wanted.as_str(),
                actual = actual.as_str(),
                "live value differs from installed value"
            );
        }
    }

    if mismatches == 0 {
        tracing::info!(checked = document.entries().len(), "all live values match");
    } else {
        tracing::warn!(checked = document.entries().len(), mismatches, "verification found drift");
    }
}

/// Remove the installed document and reload what remains. Files neutralized
/// or relocated by earlier runs are left as they are, the backups next to
/// them hold the original content.
fn uninstall(args: &Args, tree: &ConfigTree) -> Result<()> {
    if args.dry_run {
        tracing::info!(dest = %tree.target.display(), "dry run, would remove");
        return Ok(());
    }

    ensure_root()?;
    if !args.yes && !cli::confirm("Remove the installed tuning configuration?")? {
        tracing::info!("aborted");
        return Ok(());
    }

    if install::remove(&tree.target)? {
        if let Err(e) = sysctl::apply_system() {
            tracing::warn!("sysctl reload failed, settings revert on next boot: {e}");
        }
    } else {
        tracing::info!(dest = %tree.target.display(), "nothing installed");
    }

    Ok(())
}

pub fn run(args: &Args) -> Result<()> {
    let tree = ConfigTree::default();

    if args.uninstall {
        return uninstall(args, &tree);
    }

    if args.dry_run {
        let inputs = cli::gather_inputs(args)?;
        let document = preview(&inputs, &tree)?;
        print!("{document}");
        return Ok(());
    }

    ensure_root()?;
    let inputs = cli::gather_inputs(args)?;

    if !args.yes {
        let prompt = format!(
            "Install {} tuning for {:.1} GiB RAM, {} Mbit/s, {:.1} ms rtt?",
            inputs.profile(),
            inputs.memory_gib(),
            inputs.bandwidth_mbps(),
            inputs.rtt_ms()
        );
        if !cli::confirm(&prompt)? {
            tracing::info!("aborted");
            return Ok(());
        }
    }

    let document = prepare_and_install(&inputs, &tree)?;
    apply_and_verify(&tree, &document);

    if let Some(interface) = args.interface.as_deref() {
        match qdisc::install_fq(interface) {
            Ok(_) => tracing::info!(interface, "fq qdisc installed"),
            Err(e) => tracing::warn!(interface, "qdisc replace failed: {e}"),
        }
    }

    Ok(())
}
