//! Build-tree locations and artifact names derived from the config.

use std::path::{Path, PathBuf};

use crate::filter::SCRATCH_DIR_NAME;
use crate::pipeline::config::DistConfig;

/// All build-tree locations for one pipeline run.
#[derive(Debug, Clone)]
pub struct DistPaths {
    pub project_root: PathBuf,
    pub build_dir: PathBuf,
    pub classes_dir: PathBuf,
    pub libs_dir: PathBuf,
    pub distributions_dir: PathBuf,
    base_name: String,
    jar_name: String,
}

impl DistPaths {
    pub fn new(project_root: &Path, config: &DistConfig) -> Self {
        let build_dir = project_root.join(&config.output.build_dir);
        Self {
            project_root: project_root.to_path_buf(),
            classes_dir: build_dir.join("classes"),
            libs_dir: build_dir.join("libs"),
            distributions_dir: build_dir.join("distributions"),
            base_name: format!("{}-{}", config.distribution_name(), config.project.version),
            jar_name: format!("{}.jar", config.product_lowercase()),
            build_dir,
        }
    }

    /// `<distribution>-<version>`, the stem of every final artifact.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// File name of the primary archive.
    pub fn jar_name(&self) -> &str {
        &self.jar_name
    }

    /// Location of the primary archive.
    pub fn jar_path(&self) -> PathBuf {
        self.libs_dir.join(&self.jar_name)
    }

    /// Staging tree for the assembled distribution.
    pub fn stage_dir(&self) -> PathBuf {
        self.distributions_dir.join(&self.base_name)
    }

    /// Scratch directory holding the unpacked base archive.
    pub fn scratch_dir(&self) -> PathBuf {
        self.distributions_dir.join(SCRATCH_DIR_NAME)
    }

    /// Root of the unpacked distribution inside the scratch directory.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir().join(&self.base_name)
    }

    /// The full zip. Also the base archive the scratch tree is expanded
    /// from; the repack stage overwrites it in place.
    pub fn zip_path(&self) -> PathBuf {
        self.distributions_dir.join(format!("{}.zip", self.base_name))
    }

    pub fn tar_gz_path(&self) -> PathBuf {
        self.distributions_dir
            .join(format!("{}.tar.gz", self.base_name))
    }

    pub fn release_zip_path(&self) -> PathBuf {
        self.distributions_dir
            .join(format!("{}-release.zip", self.base_name))
    }

    pub fn release_tar_gz_path(&self) -> PathBuf {
        self.distributions_dir
            .join(format!("{}-release.tar.gz", self.base_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn artifact_names_follow_product_and_version() {
        let paths = DistPaths::new(Path::new("/work/project"), &config());

        assert_eq!(paths.jar_name(), "autoscript-dbc.jar");
        assert_eq!(paths.base_name(), "autoscript-dbc-1.0.2");
        assert!(paths
            .release_zip_path()
            .ends_with("build/distributions/autoscript-dbc-1.0.2-release.zip"));
        assert!(paths
            .tar_gz_path()
            .ends_with("build/distributions/autoscript-dbc-1.0.2.tar.gz"));
    }

    #[test]
    fn scratch_lives_under_distributions() {
        let paths = DistPaths::new(Path::new("/work/project"), &config());
        assert_eq!(
            paths.scratch_root(),
            Path::new("/work/project/build/distributions/tmp/autoscript-dbc-1.0.2")
        );
    }
}
