//! Emission sink: duplicate tracking in front of the host emit service.

use crate::errors::PipelineError;
use crate::host::SourceEmitter;
use std::collections::HashSet;
use tracing::debug;

/// Accepts `(fqn, source)` pairs and forwards them to the host.
///
/// A fully-qualified name may be written at most once per round; duplicates
/// and host failures are both fatal.
pub struct EmissionSink<'a> {
    emitter: &'a mut dyn SourceEmitter,
    seen: HashSet<String>,
}

impl<'a> EmissionSink<'a> {
    pub fn new(emitter: &'a mut dyn SourceEmitter) -> Self {
        EmissionSink {
            emitter,
            seen: HashSet::new(),
        }
    }

    /// Number of sources emitted so far in this round.
    pub fn emitted(&self) -> usize {
        self.seen.len()
    }

    pub fn emit(&mut self, fqn: &str, source: &str) -> Result<(), PipelineError> {
        if !self.seen.insert(fqn.to_string()) {
            return Err(PipelineError::DuplicateEmission {
                fqn: fqn.to_string(),
            });
        }
        debug!(fqn, bytes = source.len(), "emitting source");
        self.emitter
            .emit(fqn, source)
            .map_err(|err| PipelineError::EmissionFailed {
                fqn: fqn.to_string(),
                message: err.to_string(),
            })
    }
}
