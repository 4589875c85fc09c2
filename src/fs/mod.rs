// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub mod mock;

/// Abstract filesystem interface.
///
/// Asset tasks only touch the disk through this trait so that pipelines can
/// be exercised against [`mock::MockFileSystem`] in tests.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Write `contents`, creating missing parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Whether `path` itself is a symbolic link (not followed).
    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// A file found below some root, with its root-relative path in forward-slash
/// form (the form glob patterns are matched against).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TreeFile {
    pub rel: String,
    pub path: PathBuf,
}

/// Recursively list every file under `root`, sorted by relative path.
///
/// A missing root yields an empty list: an absent source or build tree is
/// indistinguishable from an empty one. Symlinked directories below the
/// root are not descended into, so a link back up the tree cannot loop.
pub fn walk_files(fs: &dyn FileSystem, root: &Path) -> Result<Vec<TreeFile>> {
    if !fs.is_dir(root) {
        debug!(root = ?root, "walk root is not a directory; treating as empty");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                if fs.is_symlink(&path) {
                    debug!(path = ?path, "skipping symlinked directory");
                    continue;
                }
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel = rel.to_string_lossy().replace('\\', "/");
                    files.push(TreeFile { rel, path });
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;

    #[test]
    fn walk_lists_nested_files_sorted() {
        let fs = MockFileSystem::new();
        fs.add_file("root/b.txt", "b");
        fs.add_file("root/a/z.css", "z");
        fs.add_file("root/a/y.css", "y");

        let files = walk_files(&fs, Path::new("root")).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["a/y.css", "a/z.css", "b.txt"]);
    }

    #[test]
    fn walk_of_missing_root_is_empty() {
        let fs = MockFileSystem::new();
        assert!(walk_files(&fs, Path::new("nope")).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn walk_does_not_follow_a_directory_link_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::write(root.join("css/site.css"), "a {}").unwrap();
        std::os::unix::fs::symlink(&root, root.join("css/loop")).unwrap();

        let files = walk_files(&RealFileSystem, &root).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["css/site.css"]);
    }
}
