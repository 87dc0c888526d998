//! Deterministic zip writer for distribution variants.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::{collect_entries, normalize_mode};
use crate::filter::RuleSet;

/// Create a zip of `source_dir`, keeping only paths that pass `rules`.
///
/// Entries are relative to `source_dir`, written in sorted order with
/// fixed timestamps and normalized modes.
pub fn create_zip(source_dir: &Path, output: &Path, rules: &RuleSet) -> Result<()> {
    if !source_dir.is_dir() {
        bail!("source directory not found: {}", source_dir.display());
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    let file =
        File::create(output).with_context(|| format!("creating '{}'", output.display()))?;
    let mut writer = ZipWriter::new(file);

    for entry in collect_entries(source_dir)? {
        if !rules.includes(Path::new(&entry.relative)) {
            continue;
        }
        let metadata = fs::symlink_metadata(&entry.path)
            .with_context(|| format!("reading metadata for '{}'", entry.path.display()))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(normalize_mode(&metadata));

        if entry.is_dir {
            writer
                .add_directory(entry.relative.as_str(), options)
                .with_context(|| format!("writing directory entry '{}'", entry.relative))?;
        } else {
            writer
                .start_file(entry.relative.as_str(), options)
                .with_context(|| format!("starting entry '{}'", entry.relative))?;
            let mut source = File::open(&entry.path)
                .with_context(|| format!("opening '{}'", entry.path.display()))?;
            io::copy(&mut source, &mut writer)
                .with_context(|| format!("writing entry '{}'", entry.relative))?;
        }
    }

    writer
        .finish()
        .with_context(|| format!("finalizing '{}'", output.display()))?;
    Ok(())
}

/// List the file entries of a zip archive (directories omitted), sorted.
pub fn list_files(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)
        .with_context(|| format!("opening '{}'", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("reading '{}'", archive_path.display()))?;

    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("reading entry {} of '{}'", i, archive_path.display()))?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    names.sort();
    Ok(names)
}
