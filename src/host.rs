//! Host compiler services.
//!
//! The pipeline consumes exactly two capabilities from its host: a list of
//! annotated declarations for the current round, and a way to open a source
//! file at a fully-qualified name. Both are small seams so the whole pipeline
//! runs against an in-memory host in tests; `summer-gen` wires them to a
//! manifest file and the real filesystem.

use crate::contract::RawContract;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a source file at a fully-qualified name.
pub trait SourceEmitter {
    /// Persist `source` under `fqn`. Implementations translate the dotted
    /// name to whatever addressing they use.
    fn emit(&mut self, fqn: &str, source: &str) -> anyhow::Result<()>;
}

/// In-memory host: records every emission, keyed and iterated by FQN.
///
/// Used by tests and structural assertions; never fails.
#[derive(Debug, Default)]
pub struct MemoryHost {
    /// FQN → emitted source
    pub emitted: BTreeMap<String, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost::default()
    }

    pub fn source(&self, fqn: &str) -> Option<&str> {
        self.emitted.get(fqn).map(String::as_str)
    }

    pub fn fqns(&self) -> impl Iterator<Item = &str> {
        self.emitted.keys().map(String::as_str)
    }
}

impl SourceEmitter for MemoryHost {
    fn emit(&mut self, fqn: &str, source: &str) -> anyhow::Result<()> {
        self.emitted.insert(fqn.to_string(), source.to_string());
        Ok(())
    }
}

/// Filesystem host: `a.b.C` becomes `<root>/a/b/C.rs`.
#[derive(Debug)]
pub struct FsEmitter {
    root: PathBuf,
    force: bool,
}

impl FsEmitter {
    pub fn new(root: impl Into<PathBuf>, force: bool) -> Self {
        FsEmitter {
            root: root.into(),
            force,
        }
    }

    /// Path a fully-qualified name maps to under this emitter's root.
    pub fn path_for(&self, fqn: &str) -> PathBuf {
        let rel = fqn.replace('.', "/");
        self.root.join(format!("{rel}.rs"))
    }
}

impl SourceEmitter for FsEmitter {
    fn emit(&mut self, fqn: &str, source: &str) -> anyhow::Result<()> {
        let path = self.path_for(fqn);
        if path.exists() && !self.force {
            anyhow::bail!("refusing to overwrite {path:?} (use --force)");
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, source)?;
        Ok(())
    }
}

/// Standalone stand-in for the host compiler's annotation scan: a manifest
/// file listing every annotated declaration plus a process-configuration map
/// for placeholder resolution.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Process configuration consulted before the environment
    pub config: HashMap<String, String>,
    /// Annotated declarations for this round
    pub declarations: Vec<RawContract>,
}

impl Manifest {
    /// Load a YAML or JSON manifest, sniffing by extension.
    pub fn load(path: &Path) -> anyhow::Result<Manifest> {
        let content = fs::read_to_string(path)?;
        let manifest = if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn fs_emitter_maps_fqn_to_path() {
        let e = FsEmitter::new("/out", true);
        assert_eq!(
            e.path_for("summer.gen.dto.Order"),
            PathBuf::from("/out/summer/gen/dto/Order.rs")
        );
    }

    #[test]
    fn manifest_parses_yaml() {
        let yaml = r#"
config:
  CLUSTER: orders
declarations:
  - name: OrderApi
    spec: openapi.yaml
    mode: ASYNC
    maxRetries: 2
"#;
        let m: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(m.config.get("CLUSTER").map(String::as_str), Some("orders"));
        assert_eq!(m.declarations.len(), 1);
        assert_eq!(m.declarations[0].name, "OrderApi");
        assert_eq!(m.declarations[0].max_retries, 2);
    }
}
