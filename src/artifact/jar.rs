//! Primary archive (jar) writer.
//!
//! A jar is a zip whose first entry is `META-INF/MANIFEST.MF` carrying the
//! implementation metadata header. The host platform reads the header to
//! identify the installed helper library.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::collect_entries;

/// Metadata header embedded in the primary archive.
#[derive(Debug, Clone)]
pub struct JarManifest {
    /// `Implementation-Title` value (the product identifier).
    pub title: String,
    /// `Created-By` value (the vendor).
    pub vendor: String,
    /// `Implementation-Version` value.
    pub version: String,
}

impl JarManifest {
    fn render(&self) -> String {
        format!(
            "Manifest-Version: 1.0\r\nImplementation-Title: {}\r\nCreated-By: {}\r\nImplementation-Version: {}\r\n",
            self.title, self.vendor, self.version
        )
    }
}

/// Package a compiled class tree into `output` with the manifest header.
///
/// Entries are written in sorted order with fixed timestamps so repeated
/// builds from the same classes produce byte-identical archives.
pub fn create_jar(classes_dir: &Path, output: &Path, manifest: &JarManifest) -> Result<()> {
    if !classes_dir.is_dir() {
        bail!("class directory not found: {}", classes_dir.display());
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    let file =
        File::create(output).with_context(|| format!("creating '{}'", output.display()))?;
    let mut writer = ZipWriter::new(file);

    writer
        .add_directory("META-INF", entry_options(0o755))
        .context("writing META-INF directory entry")?;
    writer
        .start_file("META-INF/MANIFEST.MF", entry_options(0o644))
        .context("starting manifest entry")?;
    writer
        .write_all(manifest.render().as_bytes())
        .context("writing manifest entry")?;

    for entry in collect_entries(classes_dir)? {
        if entry.is_dir {
            writer
                .add_directory(entry.relative.as_str(), entry_options(0o755))
                .with_context(|| format!("writing directory entry '{}'", entry.relative))?;
        } else {
            writer
                .start_file(entry.relative.as_str(), entry_options(0o644))
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

fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(mode)
}
