//! Filesystem safety policy: answers "is it OK to delete this path?"
//! without performing any deletion itself.

use crate::model::FileIdentity;
use std::path::Path;

/// Returns a reason string if deletion should be blocked, or `None` if
/// the path is clear to delete.
pub fn should_block_delete(path: &Path, allow_hardlink_deletes: bool, follow_symlinks: bool) -> Option<String> {
    if path.is_dir() {
        return Some("is_directory".to_string());
    }
    if !path.exists() {
        return Some("missing".to_string());
    }

    match FileIdentity::from_path(path, follow_symlinks) {
        Ok(ident) if ident.is_hardlinked() && !allow_hardlink_deletes => {
            Some(format!("hardlink_protected (nlink={})", ident.link_count))
        }
        Ok(_) => None,
        Err(e) => Some(format!("stat_failed: {e}")),
    }
}
