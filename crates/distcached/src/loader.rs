//! Directory-backed loader: one file per key

use anyhow::{bail, Context, Result};
use distcache::{LoadError, Loader};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads `key` from the file `root/key`
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    /// Create a loader over an existing directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let meta = fs::metadata(root)
            .with_context(|| format!("Failed to open group directory {}", root.display()))?;
        if !meta.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Directory keys are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keys name a single file directly under the root
fn is_plain_file_name(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains("..")
        && !key.contains(['/', '\\', '\0'])
}

impl Loader for DirLoader {
    fn load(&self, key: &str) -> std::result::Result<Vec<u8>, LoadError> {
        if !is_plain_file_name(key) {
            debug!("Rejected key {:?} for {}", key, self.root.display());
            return Err(LoadError::NotFound);
        }

        let path = self.root.join(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LoadError::NotFound),
            Err(e) => Err(LoadError::Failed(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader_with(files: &[(&str, &[u8])]) -> (TempDir, DirLoader) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let loader = DirLoader::new(dir.path()).unwrap();
        (dir, loader)
    }

    #[test]
    fn test_reads_file_by_key() {
        let (_dir, loader) = loader_with(&[("cat.png", b"\x89PNG"), ("a b", b"spaced")]);

        assert_eq!(loader.load("cat.png").unwrap(), b"\x89PNG");
        assert_eq!(loader.load("a b").unwrap(), b"spaced");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_dir, loader) = loader_with(&[]);
        assert_eq!(loader.load("nope"), Err(LoadError::NotFound));
    }

    #[test]
    fn test_escaping_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(dir.path().join("secret"), b"s3cret").unwrap();
        let loader = DirLoader::new(&root).unwrap();

        for key in ["", ".", "..", "../secret", "sub/file", "..\\secret", "a..b"] {
            assert_eq!(loader.load(key), Err(LoadError::NotFound), "{:?}", key);
        }
    }

    #[test]
    fn test_directory_entry_fails() {
        let (dir, loader) = loader_with(&[]);
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(matches!(loader.load("sub"), Err(LoadError::Failed(_))));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        assert!(DirLoader::new(&file).is_err());
        assert!(DirLoader::new(dir.path().join("missing")).is_err());
    }
}
