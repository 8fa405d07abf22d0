//! Enumerates the files that make up a profile build.
//!
//! A profile's source tree lives at `{source_root}/{slug}`. Loader- and
//! version-specific files sit in overlay directories below it:
//!
//! ```text
//! {slug}/
//!   mods/...                      base layer
//!   .overlays/fabric/...          applied for loader "fabric"
//!   .overlays/fabric-1.20.1/...   applied for loader "fabric", version "1.20.1"
//! ```
//!
//! Layers are applied in that order. A file in a later layer replaces the
//! file with the same relative path from an earlier one.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the directory holding overlays, directly under the profile root.
pub const OVERLAY_DIR: &str = ".overlays";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Path relative to its layer root, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// Layer roots for a profile, in application order.
pub fn layer_roots(profile_root: &Path, loader_type: &str, mc_version: &str) -> [PathBuf; 3] {
    let overlays = profile_root.join(OVERLAY_DIR);
    [
        profile_root.to_path_buf(),
        overlays.join(loader_type),
        overlays.join(format!("{loader_type}-{mc_version}")),
    ]
}

/// Scan the source tree of `slug`, merging overlays for the given loader and version.
///
/// A missing profile root or overlay directory contributes nothing. Entries
/// that disappear during the walk are ignored. Relative paths are compared
/// case-insensitively, matching object-store key semantics.
pub fn scan_profile(
    source_root: &Path,
    slug: &str,
    loader_type: &str,
    mc_version: &str,
) -> Result<Vec<ScanEntry>, ScanError> {
    let profile_root = source_root.join(slug);
    let mut entries: Vec<ScanEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (depth, root) in layer_roots(&profile_root, loader_type, mc_version)
        .iter()
        .enumerate()
    {
        let is_base = depth == 0;
        let layer = scan_layer(root, is_base)?;
        debug!(layer = %root.display(), files = layer.len(), "Scanned layer");

        for entry in layer {
            match positions.get(&entry.relative_path.to_lowercase()) {
                Some(&index) => entries[index].absolute_path = entry.absolute_path,
                None => {
                    positions.insert(entry.relative_path.to_lowercase(), entries.len());
                    entries.push(entry);
                }
            }
        }
    }

    Ok(entries)
}

/// Walk one layer in file-name order without following symlinks.
fn scan_layer(root: &Path, skip_overlays: bool) -> Result<Vec<ScanEntry>, ScanError> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(skip_overlays && e.depth() == 1 && e.file_name() == OVERLAY_DIR));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(&e) => continue,
            Err(source) => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    source,
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(ScanEntry {
            relative_path: to_slash_path(relative)?,
            absolute_path: entry.into_path(),
        });
    }

    Ok(files)
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound)
}

fn to_slash_path(relative: &Path) -> Result<String, ScanError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ScanError::NonUtf8Path(relative.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn paths(entries: &[ScanEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.relative_path.as_str()).collect()
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = scan_profile(dir.path(), "absent", "fabric", "1.20.1").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn base_layer_sorted_with_slash_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pack");
        write(&root, "options.txt", "o");
        write(&root, "mods/b.jar", "b");
        write(&root, "mods/a.jar", "a");
        write(&root, "config/x/y.toml", "y");
        fs::create_dir_all(root.join("empty")).unwrap();

        let entries = scan_profile(dir.path(), "pack", "fabric", "1.20.1").unwrap();
        assert_eq!(
            paths(&entries),
            vec!["config/x/y.toml", "mods/a.jar", "mods/b.jar", "options.txt"]
        );
        assert_eq!(entries[1].absolute_path, root.join("mods").join("a.jar"));
    }

    #[test]
    fn overlays_replace_in_place_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pack");
        write(&root, "mods/a.jar", "base-a");
        write(&root, "mods/c.jar", "base-c");
        write(&root, ".overlays/fabric/mods/a.jar", "fabric-a");
        write(&root, ".overlays/fabric/mods/f.jar", "fabric-f");
        write(&root, ".overlays/fabric-1.20.1/mods/a.jar", "versioned-a");
        write(&root, ".overlays/forge/mods/z.jar", "forge-z");

        let entries = scan_profile(dir.path(), "pack", "fabric", "1.20.1").unwrap();
        assert_eq!(paths(&entries), vec!["mods/a.jar", "mods/c.jar", "mods/f.jar"]);
        assert_eq!(
            fs::read_to_string(&entries[0].absolute_path).unwrap(),
            "versioned-a"
        );
        assert_eq!(
            fs::read_to_string(&entries[2].absolute_path).unwrap(),
            "fabric-f"
        );
    }

    #[test]
    fn overlay_dir_never_appears_in_base_layer() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pack");
        write(&root, "a.txt", "a");
        write(&root, ".overlays/forge/b.txt", "b");

        let entries = scan_profile(dir.path(), "pack", "fabric", "1.20.1").unwrap();
        assert_eq!(paths(&entries), vec!["a.txt"]);
    }

    #[test]
    fn nested_overlays_name_is_regular_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pack");
        write(&root, "config/.overlays/keep.txt", "k");

        let entries = scan_profile(dir.path(), "pack", "fabric", "1.20.1").unwrap();
        assert_eq!(paths(&entries), vec!["config/.overlays/keep.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        write(&outside, "secret.txt", "s");
        let root = dir.path().join("pack");
        write(&root, "a.txt", "a");
        std::os::unix::fs::symlink(&outside, root.join("linked")).unwrap();
        std::os::unix::fs::symlink(outside.join("secret.txt"), root.join("file-link")).unwrap();

        let entries = scan_profile(dir.path(), "pack", "fabric", "1.20.1").unwrap();
        assert_eq!(paths(&entries), vec!["a.txt"]);
    }
}
