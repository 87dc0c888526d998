//! Java compile stage.
//!
//! Compiles the helper-library sources with the host `javac` against
//! compile-time-only platform jars supplied in the configured library
//! directories. Those jars are owned by the host platform and are never
//! redistributed in any artifact.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::pipeline::config::DistConfig;

/// Collect the `.java` sources under `source_dir` in sorted order.
pub fn collect_sources(source_dir: &Path) -> Result<Vec<PathBuf>> {
    if !source_dir.is_dir() {
        bail!("source directory not found: {}", source_dir.display());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", source_dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("java")
        {
            sources.push(entry.into_path());
        }
    }
    sources.sort();

    if sources.is_empty() {
        bail!("no Java sources found under {}", source_dir.display());
    }
    Ok(sources)
}

/// Collect every jar in the library directories, sorted. Missing
/// directories are skipped; unresolved symbols then surface as compile
/// failures.
pub fn collect_classpath(project_root: &Path, lib_dirs: &[String]) -> Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    for dir in lib_dirs {
        let dir = project_root.join(dir);
        if !dir.is_dir() {
            continue;
        }
        for entry in
            fs::read_dir(&dir).with_context(|| format!("reading '{}'", dir.display()))?
        {
            let entry = entry.with_context(|| format!("reading '{}'", dir.display()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jar") {
                jars.push(path);
            }
        }
    }
    jars.sort();
    Ok(jars)
}

/// Run `javac` over the project sources into `classes_dir`.
///
/// Returns the number of compiled source files. A non-zero compiler exit
/// aborts the build with the compiler diagnostic.
pub fn compile_sources(
    project_root: &Path,
    config: &DistConfig,
    classes_dir: &Path,
) -> Result<usize> {
    let source_dir = project_root.join(&config.compile.source_dir);
    let sources = collect_sources(&source_dir)?;
    let classpath = collect_classpath(project_root, &config.compile.lib_dirs)?;

    fs::create_dir_all(classes_dir)
        .with_context(|| format!("creating '{}'", classes_dir.display()))?;

    let mut command = Command::new("javac");
    command
        .arg("--release")
        .arg(&config.compile.release)
        .arg("-d")
        .arg(classes_dir);
    if !classpath.is_empty() {
        let joined = std::env::join_paths(&classpath).context("assembling classpath")?;
        command.arg("-classpath").arg(joined);
    }
    command.args(&sources);

    let output = command
        .output()
        .context("running javac (is a JDK installed?)")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "javac failed with status {}:\n{}",
            output.status,
            stderr.trim()
        );
    }

    Ok(sources.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sources_are_sorted() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("b")).unwrap();
        fs::create_dir_all(src.join("a")).unwrap();
        fs::write(src.join("b/Second.java"), "class Second {}").unwrap();
        fs::write(src.join("a/First.java"), "class First {}").unwrap();
        fs::write(src.join("a/notes.txt"), "not a source").unwrap();

        let sources = collect_sources(&src).unwrap();
        assert_eq!(sources, [src.join("a/First.java"), src.join("b/Second.java")]);
    }

    #[test]
    fn empty_source_tree_fails() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let err = collect_sources(&src).unwrap_err().to_string();
        assert!(err.contains("no Java sources"));
    }

    #[test]
    fn missing_source_dir_fails() {
        let temp = TempDir::new().unwrap();
        assert!(collect_sources(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn classpath_collects_jars_only() {
        let temp = TempDir::new().unwrap();
        let libs = temp.path().join("libs");
        fs::create_dir_all(&libs).unwrap();
        fs::write(libs.join("businessobjects.jar"), b"jar").unwrap();
        fs::write(libs.join("asset-management.jar"), b"jar").unwrap();
        fs::write(libs.join("readme.txt"), b"txt").unwrap();

        let jars = collect_classpath(temp.path(), &["libs".to_string()]).unwrap();
        assert_eq!(
            jars,
            [
                libs.join("asset-management.jar"),
                libs.join("businessobjects.jar"),
            ]
        );
    }

    #[test]
    fn missing_lib_dir_is_skipped() {
        let temp = TempDir::new().unwrap();
        let jars = collect_classpath(temp.path(), &["libs".to_string()]).unwrap();
        assert!(jars.is_empty());
    }
}
