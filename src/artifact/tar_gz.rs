//! Deterministic gzipped tarball writer for distribution variants.
//!
//! Entry order, modes, ownership, and timestamps are normalized so that a
//! tarball and a zip built from the same tree with the same rule set are
//! content-equivalent, and rebuilds are byte-identical. `SOURCE_DATE_EPOCH`
//! is honored for entry mtimes.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::Path;
use tar::{Builder as TarBuilder, EntryType, Header};

use crate::artifact::{archive_mtime, collect_entries, normalize_mode};
use crate::filter::RuleSet;

/// Create a gzipped tarball of `source_dir`, keeping only paths that pass
/// `rules`. Entries are relative to `source_dir`.
pub fn create_tar_gz(source_dir: &Path, output: &Path, rules: &RuleSet) -> Result<()> {
    if !source_dir.is_dir() {
        bail!("source directory not found: {}", source_dir.display());
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    let file =
        File::create(output).with_context(|| format!("creating '{}'", output.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = TarBuilder::new(encoder);
    let mtime = archive_mtime();

    for entry in collect_entries(source_dir)? {
        if !rules.includes(Path::new(&entry.relative)) {
            continue;
        }
        let metadata = fs::symlink_metadata(&entry.path)
            .with_context(|| format!("reading metadata for '{}'", entry.path.display()))?;

        let mut header = Header::new_gnu();
        header.set_mtime(mtime);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(normalize_mode(&metadata));

        if entry.is_dir {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            header.set_cksum();
            let name = format!("{}/", entry.relative);
            builder
                .append_data(&mut header, name, std::io::empty())
                .with_context(|| format!("writing directory entry '{}'", entry.relative))?;
        } else if metadata.is_file() {
            header.set_entry_type(EntryType::Regular);
            header.set_size(metadata.len());
            header.set_cksum();
            let mut source = File::open(&entry.path)
                .with_context(|| format!("opening '{}'", entry.path.display()))?;
            builder
                .append_data(&mut header, entry.relative.as_str(), &mut source)
                .with_context(|| format!("writing entry '{}'", entry.relative))?;
        }
        // Special files (sockets, fifos, devices) never occur in staged
        // distribution trees and are skipped.
    }

    let encoder = builder
        .into_inner()
        .with_context(|| format!("finalizing '{}'", output.display()))?;
    encoder
        .finish()
        .with_context(|| format!("flushing '{}'", output.display()))?;
    Ok(())
}

/// List the file entries of a gzipped tarball (directories omitted), sorted.
pub fn list_files(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)
        .with_context(|| format!("opening '{}'", archive_path.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut names = Vec::new();
    for entry in archive
        .entries()
        .with_context(|| format!("reading '{}'", archive_path.display()))?
    {
        let entry = entry.with_context(|| format!("reading '{}'", archive_path.display()))?;
        if entry.header().entry_type() == EntryType::Regular {
            let path = entry
                .path()
                .with_context(|| format!("reading entry path in '{}'", archive_path.display()))?;
            names.push(path.to_string_lossy().replace('\\', "/"));
        }
    }
    names.sort();
    Ok(names)
}
