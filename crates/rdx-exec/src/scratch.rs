use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Uniquely named scratch directory, removed when dropped (including on panic
/// unwinding and early returns).
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name` inside the directory and return the full path.
    pub fn write(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let scratch = ScratchDir::create("rdx_test_").unwrap();
        let file = scratch.write("input.rs", "fn main() {}").unwrap();
        let root = scratch.path().to_path_buf();
        assert!(file.exists());
        assert!(root.file_name().unwrap().to_string_lossy().starts_with("rdx_test_"));
        drop(scratch);
        assert!(!root.exists());
    }

    #[test]
    fn directories_are_unique() {
        let a = ScratchDir::create("rdx_test_").unwrap();
        let b = ScratchDir::create("rdx_test_").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
