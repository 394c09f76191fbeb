//! Input resolution: validate the caller-supplied PDF path.
//!
//! The magic-byte sniff happens before any network traffic so a wrong path
//! fails with a local, descriptive error instead of a confusing rejection
//! from the file service.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local PDF path, validating existence, readability, and the
/// `%PDF` magic bytes.
pub fn resolve_local(path: &Path) -> Result<PathBuf, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ExtractError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}
