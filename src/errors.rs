use std::fmt;

/// Error raised by the contract-to-source pipeline.
///
/// Recoverable variants are reported as diagnostics against the offending
/// declaration and the round moves on to the next one; fatal variants
/// ([`PipelineError::is_fatal`]) abort the round and propagate to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A `${...}` token was opened but never closed.
    MalformedPlaceholder {
        /// The string containing the unclosed token
        input: String,
    },
    /// A contract invariant does not hold after normalization.
    ///
    /// One instance is raised per broken invariant.
    InvalidContract {
        /// The annotation field that failed validation
        field: String,
        /// The offending value
        value: String,
        /// What was expected
        reason: String,
    },
    /// The OpenAPI sub-generator failed for this contract.
    SkeletonGenerationFailed {
        /// Wrapped sub-generator failure
        message: String,
    },
    /// The sub-generator ran but the skeleton is unusable: the required
    /// `<Resource>ApiService` interface is absent or declares no method.
    DegenerateSkeleton {
        /// What was missing
        message: String,
    },
    /// The same fully-qualified name was emitted twice within one round.
    DuplicateEmission {
        /// The duplicated fully-qualified name
        fqn: String,
    },
    /// The host emit service failed (filesystem or transport).
    EmissionFailed {
        /// The fully-qualified name being written
        fqn: String,
        /// Wrapped host failure
        message: String,
    },
}

impl PipelineError {
    /// Whether this error aborts the round instead of being reported as a
    /// per-declaration diagnostic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::DuplicateEmission { .. } | PipelineError::EmissionFailed { .. }
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MalformedPlaceholder { input } => {
                write!(f, "malformed placeholder: unclosed '${{' in \"{input}\"")
            }
            PipelineError::InvalidContract {
                field,
                value,
                reason,
            } => {
                write!(f, "invalid contract: {field} = \"{value}\" ({reason})")
            }
            PipelineError::SkeletonGenerationFailed { message } => {
                write!(f, "skeleton generation failed: {message}")
            }
            PipelineError::DegenerateSkeleton { message } => {
                write!(f, "degenerate skeleton: {message}")
            }
            PipelineError::DuplicateEmission { fqn } => {
                write!(f, "duplicate emission for {fqn}")
            }
            PipelineError::EmissionFailed { fqn, message } => {
                write!(f, "emission failed for {fqn}: {message}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Severity of a diagnostic reported against a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The declaration was skipped
    Error,
    /// Processing continued; the contract is suspicious but legal
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic attached to an annotated declaration.
///
/// The driver collects one of these per recoverable failure (and per soft
/// lint) instead of aborting the round.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Simple name of the annotated declaration (e.g. `OrderApi`)
    pub declaration: String,
    /// Error or warning
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Diagnostic for a recoverable pipeline error.
    pub fn error(declaration: impl Into<String>, err: &PipelineError) -> Self {
        Diagnostic {
            declaration: declaration.into(),
            severity: Severity::Error,
            message: err.to_string(),
        }
    }

    /// Soft-lint warning.
    pub fn warning(declaration: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            declaration: declaration.into(),
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.declaration, self.message)
    }
}
