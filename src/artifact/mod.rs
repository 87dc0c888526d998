//! Archive writers for distribution artifacts.
//!
//! All writers enumerate source trees in sorted order and normalize entry
//! metadata (timestamps, modes, ownership) so a rebuild from identical
//! inputs produces byte-identical archives.

pub mod jar;
pub mod tar_gz;
pub mod unpack;
pub mod zip;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Environment variable honored for reproducible archive timestamps.
pub const SOURCE_DATE_EPOCH_VAR: &str = "SOURCE_DATE_EPOCH";

/// One entry of a source tree, with its path relative to the tree root
/// using forward slashes.
#[derive(Debug, Clone)]
pub(crate) struct TreeEntry {
    pub(crate) path: PathBuf,
    pub(crate) relative: String,
    pub(crate) is_dir: bool,
}

/// Collect every entry under `root` in deterministic sorted order.
pub(crate) fn collect_entries(root: &Path) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", root.display()))?;
        if entry.path() == root {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let is_dir = entry.file_type().is_dir();
        entries.push(TreeEntry {
            path: entry.into_path(),
            relative,
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}

/// Normalized entry mode: directories and executables get 0o755,
/// everything else 0o644. Keeps output independent of the host umask.
pub(crate) fn normalize_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if metadata.is_dir() {
        0o755
    } else if metadata.permissions().mode() & 0o111 != 0 {
        0o755
    } else {
        0o644
    }
}

/// Archive entry mtime: `SOURCE_DATE_EPOCH` when set, otherwise the epoch.
pub(crate) fn archive_mtime() -> u64 {
    std::env::var(SOURCE_DATE_EPOCH_VAR)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Compute the SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("reading '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<artifact>.sha256` next to an artifact, in the usual
/// `<digest>  <filename>` form, and return the checksum file path.
pub fn write_checksum_file(artifact: &Path) -> Result<PathBuf> {
    let digest = sha256_file(artifact)?;
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let checksum_path = PathBuf::from(format!("{}.sha256", artifact.display()));
    fs::write(&checksum_path, format!("{}  {}\n", digest, name))
        .with_context(|| format!("writing '{}'", checksum_path.display()))?;
    Ok(checksum_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_are_sorted_and_relative() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("b/nested")).unwrap();
        fs::write(temp.path().join("b/nested/two.txt"), "2").unwrap();
        fs::write(temp.path().join("a.txt"), "1").unwrap();

        let entries = collect_entries(temp.path()).unwrap();
        let relative: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(relative, ["a.txt", "b", "b/nested", "b/nested/two.txt"]);
        assert!(entries[1].is_dir);
        assert!(!entries[3].is_dir);
    }

    #[test]
    fn checksum_file_contents() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("bundle.zip");
        fs::write(&artifact, b"payload").unwrap();

        let checksum_path = write_checksum_file(&artifact).unwrap();
        let contents = fs::read_to_string(&checksum_path).unwrap();
        assert!(contents.ends_with("  bundle.zip\n"));
        assert_eq!(contents.split_whitespace().next().unwrap().len(), 64);
    }
}
