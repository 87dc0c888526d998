//! Distribution tree assembler.
//!
//! Lays the primary archive and the raw class files into the install
//! layout the host platform expects, then copies the raw distribution
//! resources (example scripts and friends) verbatim over the tree.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::pipeline::config::DistConfig;
use crate::pipeline::paths::DistPaths;

/// Build the staging tree for one distribution, replacing any previous
/// one, and return its path.
pub fn assemble_distribution(config: &DistConfig, paths: &DistPaths) -> Result<PathBuf> {
    let stage_dir = paths.stage_dir();
    if stage_dir.exists() {
        fs::remove_dir_all(&stage_dir)
            .with_context(|| format!("removing stale staging tree '{}'", stage_dir.display()))?;
    }
    fs::create_dir_all(&stage_dir)
        .with_context(|| format!("creating staging tree '{}'", stage_dir.display()))?;

    // Primary archive into the application library location.
    let jar_src = paths.jar_path();
    if !jar_src.is_file() {
        bail!("primary archive missing: {}", jar_src.display());
    }
    let lib_dir = stage_dir.join(&config.layout.app_lib_dir);
    fs::create_dir_all(&lib_dir)
        .with_context(|| format!("creating '{}'", lib_dir.display()))?;
    fs::copy(&jar_src, lib_dir.join(paths.jar_name()))
        .with_context(|| format!("staging '{}'", jar_src.display()))?;

    // Raw class files into the tools location. Directories that hold no
    // class files are omitted.
    copy_class_files(
        &paths.classes_dir,
        &stage_dir.join(&config.layout.tools_classes_dir),
    )?;

    // Distribution resources verbatim over the tree.
    let resources = paths.project_root.join(&config.layout.resources_dir);
    if resources.is_dir() {
        copy_dir_recursive(&resources, &stage_dir)?;
    }

    Ok(stage_dir)
}

fn copy_class_files(classes_dir: &Path, dest: &Path) -> Result<usize> {
    if !classes_dir.is_dir() {
        bail!("class directory not found: {}", classes_dir.display());
    }

    let mut copied = 0;
    for entry in WalkDir::new(classes_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", classes_dir.display()))?;
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|e| e.to_str()) != Some("class")
        {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(classes_dir)
            .unwrap_or(entry.path());
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }
        fs::copy(entry.path(), &target)
            .with_context(|| format!("staging '{}'", entry.path().display()))?;
        copied += 1;
    }

    if copied == 0 {
        bail!("no class files found under {}", classes_dir.display());
    }
    Ok(copied)
}

/// Recursively copy a directory tree, preserving symlinks.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)
            .with_context(|| format!("creating '{}'", dst.display()))?;
    }

    for entry in
        fs::read_dir(src).with_context(|| format!("reading '{}'", src.display()))?
    {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            let target = fs::read_link(&src_path)?;
            if dst_path.exists() || dst_path.is_symlink() {
                fs::remove_file(&dst_path)?;
            }
            std::os::unix::fs::symlink(&target, &dst_path)
                .with_context(|| format!("creating symlink '{}'", dst_path.display()))?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)
                .with_context(|| format!("copying '{}'", src_path.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> DistConfig {
        toml::from_str(
            r#"
[project]
product = "autoscript-dbc"
vendor = "Sharptree"
version = "1.0.2"
"#,
        )
        .unwrap()
    }

    fn prepare_build(root: &Path, paths: &DistPaths) {
        fs::create_dir_all(paths.classes_dir.join("io/sharptree")).unwrap();
        fs::write(
            paths.classes_dir.join("io/sharptree/Config.class"),
            b"class",
        )
        .unwrap();
        fs::create_dir_all(&paths.libs_dir).unwrap();
        fs::write(paths.jar_path(), b"jar").unwrap();

        let scripts = root.join("src/main/dist/tools/maximo/en/example/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("example.js"), b"js").unwrap();
    }

    #[test]
    fn staging_tree_has_install_layout() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_build(temp.path(), &paths);

        let stage_dir = assemble_distribution(&config, &paths).unwrap();

        assert!(stage_dir
            .join("applications/maximo/lib/autoscript-dbc.jar")
            .is_file());
        assert!(stage_dir
            .join("tools/maximo/classes/io/sharptree/Config.class")
            .is_file());
        assert!(stage_dir
            .join("tools/maximo/en/example/scripts/example.js")
            .is_file());
    }

    #[test]
    fn non_class_files_are_not_staged_into_tools() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_build(temp.path(), &paths);
        fs::write(paths.classes_dir.join("io/notes.txt"), b"txt").unwrap();

        let stage_dir = assemble_distribution(&config, &paths).unwrap();

        assert!(!stage_dir.join("tools/maximo/classes/io/notes.txt").exists());
    }

    #[test]
    fn missing_primary_archive_fails() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_build(temp.path(), &paths);
        fs::remove_file(paths.jar_path()).unwrap();

        let err = assemble_distribution(&config, &paths)
            .unwrap_err()
            .to_string();
        assert!(err.contains("primary archive missing"));
    }

    #[test]
    fn stale_staging_tree_is_replaced() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_build(temp.path(), &paths);

        let stale = paths.stage_dir().join("leftover.txt");
        fs::create_dir_all(paths.stage_dir()).unwrap();
        fs::write(&stale, b"old").unwrap();

        assemble_distribution(&config, &paths).unwrap();
        assert!(!stale.exists());
    }
}
