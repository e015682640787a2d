//! Round driver: declarations in, sources and diagnostics out.
//!
//! One round walks every annotated declaration in order. A declaration
//! flows normalize → skeleton → bridge, plus the channel stack for ASYNC
//! contracts. Recoverable failures skip the declaration and surface as
//! diagnostics; fatal emission errors abort the round.

use tracing::{error, info, warn};

use crate::bridge;
use crate::contract::{normalize, Contract, Mode, RawContract};
use crate::emit::EmissionSink;
use crate::errors::{Diagnostic, PipelineError};
use crate::host::SourceEmitter;
use crate::placeholder::PlaceholderResolver;
use crate::skeleton::{self, first_operation, OpenApiBackend, SkeletonBackend};
use crate::stack;

/// Outcome of one pipeline round.
#[derive(Debug, Default)]
pub struct RoundReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Declarations that made it all the way through
    pub processed: usize,
    /// Sources written to the host
    pub emitted: usize,
}

impl RoundReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::errors::Severity::Error)
    }
}

/// Suspicious-but-legal contract shapes reported as warnings.
pub fn soft_lints(raw: &RawContract) -> Vec<Diagnostic> {
    let mut lints = Vec::new();
    if raw.mode == Mode::Async && raw.max_retries <= 0 && raw.dlq.is_empty() {
        lints.push(Diagnostic::warning(
            &raw.name,
            "unbounded retries without a dead-letter channel can block the stack forever",
        ));
    }
    if raw.mode == Mode::Sync && (raw.circuit_breaker || !raw.dlq.is_empty() || raw.batch_size > 1)
    {
        lints.push(Diagnostic::warning(
            &raw.name,
            "channel resiliency settings have no effect in SYNC mode",
        ));
    }
    lints
}

/// Run one round with the default OpenAPI backend.
pub fn run_round(
    declarations: &[RawContract],
    resolver: &PlaceholderResolver,
    emitter: &mut dyn SourceEmitter,
) -> anyhow::Result<RoundReport> {
    run_round_with(declarations, resolver, &OpenApiBackend::new(), emitter)
}

/// Run one round with an explicit skeleton backend.
pub fn run_round_with(
    declarations: &[RawContract],
    resolver: &PlaceholderResolver,
    backend: &dyn SkeletonBackend,
    emitter: &mut dyn SourceEmitter,
) -> anyhow::Result<RoundReport> {
    let mut report = RoundReport::default();
    let mut sink = EmissionSink::new(emitter);

    for raw in declarations {
        report.diagnostics.extend(soft_lints(raw));
        let contract = match normalize(raw, resolver) {
            Ok(contract) => contract,
            Err(errors) => {
                // one diagnostic per broken invariant
                for err in &errors {
                    warn!(declaration = %raw.name, %err, "contract invariant broken");
                    report.diagnostics.push(Diagnostic::error(&raw.name, err));
                }
                continue;
            }
        };
        match process(&contract, backend, &mut sink) {
            Ok(()) => report.processed += 1,
            Err(err) if err.is_fatal() => {
                error!(declaration = %raw.name, %err, "fatal error, aborting round");
                report.emitted = sink.emitted();
                return Err(err.into());
            }
            Err(err) => {
                warn!(declaration = %raw.name, %err, "declaration skipped");
                report.diagnostics.push(Diagnostic::error(&raw.name, &err));
            }
        }
    }

    report.emitted = sink.emitted();
    info!(
        declarations = declarations.len(),
        processed = report.processed,
        emitted = report.emitted,
        diagnostics = report.diagnostics.len(),
        "round complete"
    );
    Ok(report)
}

fn process(
    contract: &Contract,
    backend: &dyn SkeletonBackend,
    sink: &mut EmissionSink<'_>,
) -> Result<(), PipelineError> {
    let skeleton = skeleton::generate(contract, backend)?;
    for (fqn, source) in &skeleton.sources {
        sink.emit(fqn, source)?;
    }

    let bridge = bridge::synthesize(contract, &skeleton)?;

    if contract.mode == Mode::Async {
        let interface_src = skeleton
            .interface_source(contract)
            .ok_or_else(|| PipelineError::DegenerateSkeleton {
                message: "interface vanished between harvest and stack planning".to_string(),
            })?;
        let op = first_operation(interface_src).ok_or_else(|| {
            PipelineError::DegenerateSkeleton {
                message: "interface lost its operations between harvest and stack planning"
                    .to_string(),
            }
        })?;
        stack::emit(contract, &op, sink)?;
    }

    sink.emit(&bridge.fqn, &bridge.source)?;
    Ok(())
}
