// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// A direct `strip_prefix(root)` is tried first; if that fails (symlinks,
/// `/private/var` on macOS) both paths are canonicalized and tried again.
///
/// Returns `None` if the path is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    // Fast path: event path already starts with our root.
    if let Ok(rel) = path.strip_prefix(root) {
        let s = rel.to_string_lossy().replace('\\', "/");
        return Some(s);
    }

    if let (Ok(root_canon), Ok(path_canon)) =
        (root.canonicalize(), path.canonicalize())
    {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            let s = rel.to_string_lossy().replace('\\', "/");
            return Some(s);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_and_normalizes() {
        assert_eq!(
            relative_str(Path::new("site/src"), Path::new("site/src/css/a.css")).as_deref(),
            Some("css/a.css")
        );
        assert_eq!(relative_str(Path::new("site/src"), Path::new("other/a.css")), None);
    }
}
