use std::path::{Component, Path, PathBuf};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Destination path must not be empty")]
    Empty,

    #[error("Destination path contains a null byte")]
    NullByte,

    #[error("Destination path contains a parent directory traversal: {0}")]
    Traversal(String),

    #[error("Destination path must be relative: {0}")]
    Absolute(String),

    #[error("Destination path escapes the output root: {0}")]
    OutsideRoot(String),
}

/// Validate a user-supplied relative destination and resolve it under `root`.
///
/// Checks run on the raw string and on its percent-decoded form, before any
/// filesystem access.
pub fn validate_destination(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    if relative.trim().is_empty() {
        return Err(PathError::Empty);
    }

    let decoded = urlencoding::decode(relative)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| relative.to_string());

    for candidate in [relative, decoded.as_str()] {
        check_lexical(candidate)?;
    }

    // Only the relative part is resolved; the root is used exactly as configured
    let relative_part = normalize(Path::new(relative));
    let escapes = relative_part
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(PathError::OutsideRoot(relative.to_string()));
    }

    Ok(root.join(relative_part))
}

fn check_lexical(candidate: &str) -> Result<(), PathError> {
    if candidate.contains('\0') {
        return Err(PathError::NullByte);
    }

    if candidate.contains("../")
        || candidate.contains("..\\")
        || candidate.split(['/', '\\']).any(|part| part == "..")
    {
        return Err(PathError::Traversal(candidate.to_string()));
    }

    if candidate.starts_with('/') || candidate.starts_with('\\') || has_drive_prefix(candidate) {
        return Err(PathError::Absolute(candidate.to_string()));
    }

    if Path::new(candidate).is_absolute() {
        return Err(PathError::Absolute(candidate.to_string()));
    }

    Ok(())
}

fn has_drive_prefix(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Lexically resolve `.` and `..` without touching the filesystem.
/// A `..` with nothing left to cancel is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}
