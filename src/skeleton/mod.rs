//! Skeleton generation against a per-declaration in-memory filesystem.
//!
//! Each declaration gets a fresh [`MemFs`] rooted at [`GEN_ROOT`]; the
//! backend renders into it and the harvest walks every `.rs` file back out
//! as a dotted FQN so emission is host-independent.

pub mod backend;
pub mod memfs;
pub mod ops;
pub mod schema;

use std::collections::BTreeMap;

use crate::contract::Contract;
use crate::errors::PipelineError;

pub use backend::{BackendOptions, OpenApiBackend, SkeletonBackend};
pub use memfs::MemFs;
pub use ops::{first_operation, OperationDescriptor};

/// Root directory for rendered sources inside the scratch filesystem.
pub const GEN_ROOT: &str = "/gen/src";

/// Map a dotted FQN to its path under the generation root.
pub fn fqn_to_path(fqn: &str) -> String {
    format!("{GEN_ROOT}/{}.rs", fqn.replace('.', "/"))
}

/// Inverse of [`fqn_to_path`] for harvested paths.
pub fn path_to_fqn(path: &str) -> Option<String> {
    path.strip_prefix(GEN_ROOT)
        .and_then(|p| p.strip_prefix('/'))
        .and_then(|p| p.strip_suffix(".rs"))
        .map(|p| p.replace('/', "."))
}

/// The harvested output of one skeleton generation run.
#[derive(Debug, Default)]
pub struct ApiSkeleton {
    /// FQN → source text, in deterministic order
    pub sources: BTreeMap<String, String>,
}

impl ApiSkeleton {
    /// FQN of the skeleton interface for this contract.
    pub fn interface_fqn(contract: &Contract) -> String {
        format!("{}.{}ApiService", contract.packages.api, contract.resource)
    }

    /// The skeleton interface source, if generated.
    pub fn interface_source(&self, contract: &Contract) -> Option<&str> {
        self.sources
            .get(&Self::interface_fqn(contract))
            .map(String::as_str)
    }
}

/// Run the backend for one contract and harvest the results.
///
/// Backend failures surface as [`PipelineError::SkeletonGenerationFailed`];
/// a run that produces no usable interface, or an interface with no
/// operations, is reported as [`PipelineError::DegenerateSkeleton`].
pub fn generate(
    contract: &Contract,
    backend: &dyn SkeletonBackend,
) -> Result<ApiSkeleton, PipelineError> {
    let mut fs = MemFs::new();
    backend
        .generate(contract, &BackendOptions::fixed(), GEN_ROOT, &mut fs)
        .map_err(|e| PipelineError::SkeletonGenerationFailed {
            message: format!("{e:#}"),
        })?;

    let mut sources = BTreeMap::new();
    for path in fs.paths() {
        if !path.ends_with(".rs") {
            continue;
        }
        let Some(fqn) = path_to_fqn(&path) else {
            continue;
        };
        if let Some(source) = fs.read(&path) {
            sources.insert(fqn, source.to_string());
        }
    }
    tracing::debug!(
        declaration = %contract.name,
        files = sources.len(),
        "skeleton harvested"
    );

    let skeleton = ApiSkeleton { sources };
    let interface = ApiSkeleton::interface_fqn(contract);
    match skeleton.interface_source(contract) {
        None => Err(PipelineError::DegenerateSkeleton {
            message: format!("generation produced no `{interface}`"),
        }),
        Some(src) if first_operation(src).is_none() => Err(PipelineError::DegenerateSkeleton {
            message: format!("`{interface}` declares no operations"),
        }),
        Some(_) => Ok(skeleton),
    }
}
