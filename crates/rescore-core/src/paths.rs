use std::fs;
use std::path::{Path, PathBuf};

/// Output file next to `input`: the file name is cut at its first `.` and
/// `extension` appended, so `My.Piece.v2.mxl` becomes `My.<extension>`.
pub fn sibling_path(input: &Path, extension: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = file_name.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{base}.{extension}"))
}

/// True when both paths resolve to one file on disk. A path that does not
/// exist never aliases another.
pub(crate) fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(meta_a), Ok(meta_b)) => same_inode(&meta_a, &meta_b, a, b),
        _ => false,
    }
}

#[cfg(unix)]
fn same_inode(meta_a: &fs::Metadata, meta_b: &fs::Metadata, _a: &Path, _b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino()
}

#[cfg(not(unix))]
fn same_inode(_meta_a: &fs::Metadata, _meta_b: &fs::Metadata, a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a.as_os_str().eq_ignore_ascii_case(b.as_os_str()),
        _ => false,
    }
}
