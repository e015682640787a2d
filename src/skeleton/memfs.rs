use std::collections::BTreeMap;

/// Isolated in-memory filesystem mounted for one sub-generator run.
///
/// Paths are unix-style strings; the filesystem lives for a single contract
/// and is released (dropped) on both success and failure.
#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, String>,
}

impl MemFs {
    pub fn new() -> Self {
        MemFs::default()
    }

    pub fn write(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// All paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_walk() {
        let mut fs = MemFs::new();
        fs.write("/gen/src/a/B.rs", "pub struct B;");
        fs.write("/gen/src/a/A.rs", "pub struct A;");
        let paths: Vec<&str> = fs.paths().collect();
        assert_eq!(paths, vec!["/gen/src/a/A.rs", "/gen/src/a/B.rs"]);
        assert_eq!(fs.read("/gen/src/a/B.rs"), Some("pub struct B;"));
        assert_eq!(fs.len(), 2);
    }
}
