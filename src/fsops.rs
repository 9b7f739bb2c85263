//! Filesystem operations for staging promotion and cleanup
//!
//! Promotion never deletes destination files: a fresh deploy copies the
//! whole tree, a hotfix merges over an existing version directory.
//! Removal tolerates read-only attributes instead of failing outright.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Copy a whole tree into a destination that does not exist yet.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    merge_tree(source, dest)
}

/// Merge-overwrite ("hotfix") a tree onto an existing destination.
///
/// Same-path files are overwritten, missing subdirectories are created,
/// destination-only files are left alone. Stale files accumulating in
/// the destination is accepted behavior, not a bug.
pub fn merge_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("Path escaped source tree: {}", entry.path().display()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory tree; no-op when it is already absent.
///
/// A first removal attempt that fails is retried after clearing
/// read-only attributes on every entry, matching how production trees
/// end up flagged read-only on network shares.
pub fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if fs::remove_dir_all(path).is_ok() {
        return Ok(());
    }

    for entry in WalkDir::new(path) {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                permissions.set_mode(0o777);
            }
            #[cfg(not(unix))]
            permissions.set_readonly(false);
            fs::set_permissions(entry.path(), permissions).with_context(|| {
                format!("Failed to clear read-only on {}", entry.path().display())
            })?;
        }
    }

    fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))
}
