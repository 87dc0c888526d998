//! Distribution archive expansion into the scratch tree.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Expand a distribution zip into `dest_dir`.
///
/// Entry names that escape the destination (absolute paths or parent
/// traversal) are skipped rather than extracted.
pub fn unpack_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("opening '{}'", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("reading '{}'", archive_path.display()))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating scratch directory '{}'", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("reading entry {} of '{}'", i, archive_path.display()))?;
        let Some(enclosed) = entry.enclosed_name() else {
            continue;
        };
        let outpath = dest_dir.join(enclosed);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .with_context(|| format!("creating '{}'", outpath.display()))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating '{}'", parent.display()))?;
            }
            let mut outfile = File::create(&outpath)
                .with_context(|| format!("creating '{}'", outpath.display()))?;
            io::copy(&mut entry, &mut outfile)
                .with_context(|| format!("extracting '{}'", outpath.display()))?;
        }

        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                .with_context(|| format!("setting permissions on '{}'", outpath.display()))?;
        }
    }

    Ok(())
}
