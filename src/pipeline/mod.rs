//! Build pipeline orchestration.
//!
//! The stage graph is modeled as an explicit ordered list: every stage
//! names its predecessors, [`PIPELINE`] is a topological order of that
//! graph, and the runner executes it front to back. Cleanup is
//! best-effort: it runs once the repack stage has finished, whether or
//! not repacking succeeded, and a failed deletion is reported as a
//! warning instead of failing the build.

pub mod assemble;
pub mod compile;
pub mod config;
pub mod paths;

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::jar::{create_jar, JarManifest};
use crate::artifact::tar_gz::create_tar_gz;
use crate::artifact::unpack::unpack_zip;
use crate::artifact::zip::create_zip;
use crate::artifact::{tar_gz, write_checksum_file, zip};
use crate::filter::{self, RuleSet};
use crate::pipeline::config::DistConfig;
use crate::pipeline::paths::DistPaths;
use crate::preflight;
use crate::script;

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preflight,
    Compile,
    Archive,
    Assemble,
    Verify,
    Pack,
    Unpack,
    Repack,
    Cleanup,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Compile => "compile",
            Stage::Archive => "archive",
            Stage::Assemble => "assemble",
            Stage::Verify => "verify",
            Stage::Pack => "pack",
            Stage::Unpack => "unpack",
            Stage::Repack => "repack",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Stages that must complete before this one may run.
    pub fn predecessors(self) -> &'static [Stage] {
        match self {
            Stage::Preflight => &[],
            Stage::Compile => &[Stage::Preflight],
            Stage::Archive => &[Stage::Compile],
            Stage::Assemble => &[Stage::Archive],
            Stage::Verify => &[Stage::Assemble],
            Stage::Pack => &[Stage::Assemble, Stage::Verify],
            Stage::Unpack => &[Stage::Pack],
            Stage::Repack => &[Stage::Unpack],
            Stage::Cleanup => &[Stage::Repack],
        }
    }
}

/// Execution order; a topological order of [`Stage::predecessors`].
pub const PIPELINE: &[Stage] = &[
    Stage::Preflight,
    Stage::Compile,
    Stage::Archive,
    Stage::Assemble,
    Stage::Verify,
    Stage::Pack,
    Stage::Unpack,
    Stage::Repack,
    Stage::Cleanup,
];

/// True when every stage in [`PIPELINE`] appears after all of its
/// predecessors.
pub fn pipeline_order_is_valid() -> bool {
    PIPELINE.iter().enumerate().all(|(index, stage)| {
        stage
            .predecessors()
            .iter()
            .all(|dep| PIPELINE[..index].contains(dep))
    })
}

/// Outcome of a successful pipeline run.
#[derive(Debug)]
pub struct BuildSummary {
    /// The four final artifacts, in emission order.
    pub artifacts: Vec<PathBuf>,
    pub sources_compiled: usize,
    pub scripts_verified: usize,
}

/// Run the full pipeline for the project rooted at `project_root`.
pub fn run_build(project_root: &Path, config: &DistConfig) -> Result<BuildSummary> {
    debug_assert!(pipeline_order_is_valid());

    let paths = DistPaths::new(project_root, config);

    stage_banner(Stage::Preflight, "checking host tools");
    preflight::check_host_tools()?;

    stage_banner(Stage::Compile, "compiling Java sources");
    let sources_compiled = compile::compile_sources(project_root, config, &paths.classes_dir)
        .context("compile stage failed")?;

    stage_banner(Stage::Archive, paths.jar_name());
    let manifest = JarManifest {
        title: config.project.product.clone(),
        vendor: config.project.vendor.clone(),
        version: config.project.version.clone(),
    };
    create_jar(&paths.classes_dir, &paths.jar_path(), &manifest)
        .context("archive stage failed")?;

    stage_banner(Stage::Assemble, "staging distribution tree");
    let stage_dir =
        assemble::assemble_distribution(config, &paths).context("assemble stage failed")?;

    stage_banner(Stage::Verify, "validating automation scripts");
    let resources_dir = project_root.join(&config.layout.resources_dir);
    let scripts_verified =
        script::verify_scripts(&resources_dir).context("verify stage failed")?;

    stage_banner(Stage::Pack, "packing base distribution archive");
    let full = filter::full_rules()?;
    create_zip(&stage_dir, &paths.zip_path(), &full).context("pack stage failed")?;

    stage_banner(Stage::Unpack, "expanding into scratch tree");
    let scratch_dir = paths.scratch_dir();
    if scratch_dir.exists() {
        fs::remove_dir_all(&scratch_dir)
            .with_context(|| format!("removing stale scratch tree '{}'", scratch_dir.display()))?;
    }
    unpack_zip(&paths.zip_path(), &paths.scratch_root()).context("unpack stage failed")?;

    stage_banner(Stage::Repack, "writing final artifacts");
    let repacked = repack_all(config, &paths);

    stage_banner(Stage::Cleanup, "removing scratch tree");
    cleanup_scratch(&paths);

    let artifacts = repacked.context("repack stage failed")?;
    Ok(BuildSummary {
        artifacts,
        sources_compiled,
        scripts_verified,
    })
}

/// Remove the build directory entirely.
pub fn clean(project_root: &Path, config: &DistConfig) -> Result<()> {
    let build_dir = project_root.join(&config.output.build_dir);
    if build_dir.exists() {
        fs::remove_dir_all(&build_dir)
            .with_context(|| format!("removing '{}'", build_dir.display()))?;
    }
    Ok(())
}

fn stage_banner(stage: Stage, message: &str) {
    println!("[{}] {}", stage.name(), message);
}

/// Produce the four final artifacts from the scratch tree, verify them,
/// and write their checksum files.
fn repack_all(config: &DistConfig, paths: &DistPaths) -> Result<Vec<PathBuf>> {
    let scratch_root = paths.scratch_root();
    let full = filter::full_rules()?;
    let release = filter::release_rules(
        paths.jar_name(),
        config.applications_root(),
        &config.layout.example_dirs,
    )?;

    create_zip(&scratch_root, &paths.zip_path(), &full)?;
    create_tar_gz(&scratch_root, &paths.tar_gz_path(), &full)?;
    create_zip(&scratch_root, &paths.release_zip_path(), &release)?;
    create_tar_gz(&scratch_root, &paths.release_tar_gz_path(), &release)?;

    let artifacts = vec![
        paths.zip_path(),
        paths.tar_gz_path(),
        paths.release_zip_path(),
        paths.release_tar_gz_path(),
    ];
    for artifact in &artifacts {
        let metadata = fs::metadata(artifact)
            .with_context(|| format!("missing artifact '{}'", artifact.display()))?;
        if metadata.len() == 0 {
            bail!("artifact '{}' is empty", artifact.display());
        }
        write_checksum_file(artifact)?;
    }

    verify_release_artifacts(paths, &release)?;
    Ok(artifacts)
}

/// Enumerate both release artifacts and confirm no excluded path slipped
/// through.
fn verify_release_artifacts(paths: &DistPaths, release: &RuleSet) -> Result<()> {
    let checks = [
        (paths.release_zip_path(), zip::list_files(&paths.release_zip_path())?),
        (
            paths.release_tar_gz_path(),
            tar_gz::list_files(&paths.release_tar_gz_path())?,
        ),
    ];
    for (artifact, names) in checks {
        for name in names {
            if !release.includes(Path::new(&name)) {
                bail!(
                    "release artifact '{}' contains excluded entry '{}'",
                    artifact.display(),
                    name
                );
            }
        }
    }
    Ok(())
}

/// Best-effort scratch removal. Never fails the build.
fn cleanup_scratch(paths: &DistPaths) {
    let scratch = paths.scratch_dir();
    if !scratch.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(&scratch) {
        eprintln!(
            "[cleanup] warning: failed to remove scratch dir '{}': {}",
            scratch.display(),
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
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

    /// Stand up compile/archive outputs by hand so the packaging stages
    /// can run without a JDK on the test host.
    fn prepare_compiled_project(root: &Path, paths: &DistPaths) {
        fs::create_dir_all(paths.classes_dir.join("io/sharptree/maximo")).unwrap();
        fs::write(
            paths.classes_dir.join("io/sharptree/maximo/Config.class"),
            b"\xca\xfe\xba\xbe",
        )
        .unwrap();

        let manifest = JarManifest {
            title: "autoscript-dbc".to_string(),
            vendor: "Sharptree".to_string(),
            version: "1.0.2".to_string(),
        };
        create_jar(&paths.classes_dir, &paths.jar_path(), &manifest).unwrap();

        let scripts = root.join("src/main/dist/tools/maximo/en/example/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(
            scripts.join("example.js"),
            r#"var scriptConfig = {"autoscript": "examplejs", "logLevel": "INFO"}"#,
        )
        .unwrap();
    }

    /// The packaging half of the pipeline: assemble through cleanup.
    fn package(root: &Path, config: &DistConfig, paths: &DistPaths) -> Result<Vec<PathBuf>> {
        let stage_dir = assemble::assemble_distribution(config, paths)?;
        script::verify_scripts(&root.join(&config.layout.resources_dir))?;
        let full = filter::full_rules()?;
        create_zip(&stage_dir, &paths.zip_path(), &full)?;
        unpack_zip(&paths.zip_path(), &paths.scratch_root())?;
        let repacked = repack_all(config, paths);
        cleanup_scratch(paths);
        repacked
    }

    #[test]
    fn pipeline_order_respects_predecessors() {
        assert!(pipeline_order_is_valid());
        assert_eq!(PIPELINE.len(), 9);
    }

    #[test]
    fn packaging_emits_four_artifacts_with_checksums() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_compiled_project(temp.path(), &paths);

        let artifacts = package(temp.path(), &config, &paths).unwrap();

        assert_eq!(artifacts.len(), 4);
        for artifact in &artifacts {
            assert!(artifact.is_file(), "missing {}", artifact.display());
            assert!(fs::metadata(artifact).unwrap().len() > 0);
            let checksum = PathBuf::from(format!("{}.sha256", artifact.display()));
            assert!(checksum.is_file(), "missing {}", checksum.display());
        }
        assert!(paths
            .release_zip_path()
            .ends_with("autoscript-dbc-1.0.2-release.zip"));
    }

    #[test]
    fn release_artifacts_drop_compiled_and_example_content() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_compiled_project(temp.path(), &paths);

        package(temp.path(), &config, &paths).unwrap();

        let names = zip::list_files(&paths.release_zip_path()).unwrap();
        assert!(!names.is_empty());
        for name in &names {
            assert!(!name.ends_with("autoscript-dbc.jar"), "found {}", name);
            assert!(!name.starts_with("applications/"), "found {}", name);
            assert!(!name.starts_with("tools/maximo/en/"), "found {}", name);
        }
    }

    #[test]
    fn zip_and_tarball_hold_identical_file_sets() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_compiled_project(temp.path(), &paths);

        package(temp.path(), &config, &paths).unwrap();

        let full_zip: BTreeSet<_> =
            zip::list_files(&paths.zip_path()).unwrap().into_iter().collect();
        let full_tar: BTreeSet<_> = tar_gz::list_files(&paths.tar_gz_path())
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(full_zip, full_tar);

        let release_zip: BTreeSet<_> = zip::list_files(&paths.release_zip_path())
            .unwrap()
            .into_iter()
            .collect();
        let release_tar: BTreeSet<_> = tar_gz::list_files(&paths.release_tar_gz_path())
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(release_zip, release_tar);
        assert!(release_zip.len() < full_zip.len());
    }

    #[test]
    fn rerun_produces_byte_identical_artifacts() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_compiled_project(temp.path(), &paths);

        package(temp.path(), &config, &paths).unwrap();
        let first: Vec<Vec<u8>> = [
            paths.zip_path(),
            paths.tar_gz_path(),
            paths.release_zip_path(),
            paths.release_tar_gz_path(),
        ]
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();

        package(temp.path(), &config, &paths).unwrap();
        let second: Vec<Vec<u8>> = [
            paths.zip_path(),
            paths.tar_gz_path(),
            paths.release_zip_path(),
            paths.release_tar_gz_path(),
        ]
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn scratch_is_removed_after_packaging() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        prepare_compiled_project(temp.path(), &paths);

        package(temp.path(), &config, &paths).unwrap();

        assert!(!paths.scratch_dir().exists());
    }

    #[test]
    fn clean_removes_build_dir() {
        let temp = TempDir::new().unwrap();
        let config = config();
        let paths = DistPaths::new(temp.path(), &config);
        fs::create_dir_all(&paths.distributions_dir).unwrap();

        clean(temp.path(), &config).unwrap();
        assert!(!paths.build_dir.exists());
    }
}
