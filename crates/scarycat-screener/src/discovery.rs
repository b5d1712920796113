//! Model discovery on the filesystem

use scarycat_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Finds model sources below a root locator
pub trait ModelDiscovery {
    fn discover(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Recursive directory scan for entries with a given extension.
///
/// Matching entries may be files or directories (compiled model bundles are
/// often directories); a matching directory is returned as a whole and not
/// descended into. Hidden entries are skipped.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    extension: String,
}

impl FsDiscovery {
    /// Create a scanner for the given extension (without the leading dot)
    pub fn new(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

impl ModelDiscovery for FsDiscovery {
    fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::ResourceNotFound(root.to_path_buf()));
        }

        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();

                if is_hidden(&path) {
                    continue;
                }

                if self.matches(&path) {
                    found.push(path);
                } else if entry.file_type()?.is_dir() {
                    pending.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Stable model name for a source: the file name without its extension
pub fn model_name(source: &Path) -> Option<String> {
    source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_root_is_resource_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("models");

        let err = FsDiscovery::new("safetensors").discover(&missing).unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(p) if p == missing));
    }

    #[test]
    fn test_discovers_files_and_bundles_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("ears_back.mlmodelc"), b"").unwrap();
        fs::create_dir_all(root.join("nested/OvO_mouth_open_vs_safe.mlmodelc/weights")).unwrap();
        fs::write(root.join("nested/OvO_mouth_open_vs_safe.mlmodelc/weights/w.bin"), b"").unwrap();
        fs::write(root.join("nested/readme.txt"), b"").unwrap();
        fs::write(root.join(".hidden.mlmodelc"), b"").unwrap();

        let found = FsDiscovery::new(".mlmodelc").discover(root).unwrap();
        let names: Vec<_> = found.iter().filter_map(|p| model_name(p)).collect();

        assert_eq!(names, vec!["ears_back", "OvO_mouth_open_vs_safe"]);
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let found = FsDiscovery::new("safetensors").discover(dir.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_model_name_strips_extension() {
        assert_eq!(
            model_name(Path::new("/models/hissing.safetensors")).as_deref(),
            Some("hissing")
        );
        assert_eq!(model_name(Path::new("/")), None);
    }
}
