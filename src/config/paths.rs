//! `~` expansion for configured paths.

use std::path::{Path, PathBuf};

/// Replace a leading `~` with the home directory, in place.
pub fn expand_tilde(path: &mut PathBuf) {
    let expanded = expand_tilde_path(path);
    *path = expanded;
}

/// Return `path` with a leading `~` replaced by the home directory.
///
/// Paths without a leading `~`, or systems without a home directory, are returned as-is.
pub fn expand_tilde_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
