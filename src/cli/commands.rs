//! Subcommand implementations.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::contract::normalize;
use crate::host::{FsEmitter, Manifest};
use crate::pipeline::{self, RoundReport};
use crate::placeholder::PlaceholderResolver;

/// `summer-gen generate`: run one round and write sources under `output`.
pub fn generate(manifest_path: &Path, output: &Path, force: bool) -> anyhow::Result<RoundReport> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to load manifest {manifest_path:?}"))?;
    let resolver = PlaceholderResolver::with_config(manifest.config.clone());
    let mut emitter = FsEmitter::new(output, force);

    let report = pipeline::run_round(&manifest.declarations, &resolver, &mut emitter)?;
    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
    info!(
        output = %output.display(),
        emitted = report.emitted,
        "generation round finished"
    );
    Ok(report)
}

/// `summer-gen lint`: normalize every declaration and report diagnostics
/// without emitting anything.
pub fn lint(manifest_path: &Path) -> anyhow::Result<usize> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to load manifest {manifest_path:?}"))?;
    let resolver = PlaceholderResolver::with_config(manifest.config.clone());

    let mut errors = 0usize;
    for raw in &manifest.declarations {
        for lint in pipeline::soft_lints(raw) {
            eprintln!("{lint}");
        }
        match normalize(raw, &resolver) {
            Ok(contract) => {
                info!(declaration = %contract.name, resource = %contract.resource, "ok");
            }
            Err(errs) => {
                for err in errs {
                    eprintln!("error: {}: {err}", raw.name);
                    errors += 1;
                }
            }
        }
    }
    Ok(errors)
}
