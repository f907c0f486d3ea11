use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, error};

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(e) => {
            debug!("shellax: metadata {}: {}", path.display(), e);
            false
        }
    }
}

/// Finds the program for `name`.
///
/// Programs are looked up in the one configured directory, never along `PATH`.
/// A name that already contains a `/` is taken as a path as is.
pub fn resolve_executable(name: &str, bin_dir: &Path) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let candidate = if name.contains('/') {
        PathBuf::from(name)
    } else {
        bin_dir.join(name)
    };

    if is_executable(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

pub fn current_dir() -> String {
    match env::current_dir() {
        Ok(dir) => dir.to_string_lossy().to_string(),
        Err(e) => {
            error!("shellax: PROMPT: env current_dir error: {}", e);
            String::new()
        }
    }
}
