use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};

/// Normalize a source id into a relative `/`-separated path.
///
/// Rejects absolute paths and `..` segments so sources stay under the assets root.
pub(crate) fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelError::validation("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

/// Resolve `source` under `root`.
pub(crate) fn resolve_asset_path(root: &Path, source: &str) -> ReelResult<PathBuf> {
    Ok(root.join(normalize_rel_path(source)?))
}

#[cfg(test)]
#[path = "../../tests/unit/media/path.rs"]
mod tests;
