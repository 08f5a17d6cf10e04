use crate::TransferError;

/// Validates a server-side path used as an upload destination or download
/// source.
///
/// Remote paths are `/`-separated and relative to the server's root.
/// Rejects:
/// - Empty paths
/// - A leading or trailing `/`
/// - Empty components (`a//b`)
/// - Parent directory traversal (`..`)
/// - Backslashes, NUL bytes and drive prefixes (`C:`)
pub fn validate_remote_path(path: &str) -> Result<(), TransferError> {
    let invalid = |reason: &str| Err(TransferError::InvalidPath(format!("{reason}: {path:?}")));

    if path.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }
    if path.starts_with('/') {
        return invalid("absolute path not allowed");
    }
    if path.ends_with('/') {
        return invalid("path must name a file");
    }
    if path.contains('\\') || path.contains('\0') {
        return invalid("illegal character in path");
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return invalid("path prefix not allowed");
    }

    for component in path.split('/') {
        match component {
            "" => return invalid("empty path component"),
            ".." => return invalid("parent directory traversal not allowed"),
            _ => {}
        }
    }

    Ok(())
}
