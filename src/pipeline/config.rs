use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Parsed and validated `dist.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Product identifier; the primary archive is named after its
    /// lowercased form.
    pub product: String,
    /// Vendor recorded in the primary archive metadata header.
    pub vendor: String,
    pub version: String,
    /// Distribution base name; defaults to the lowercased product.
    pub distribution: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompileConfig {
    pub source_dir: String,
    /// Directories holding compile-time-only jars. Never redistributed.
    pub lib_dirs: Vec<String>,
    /// Java language release passed to the compiler.
    pub release: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            source_dir: "src/main/java".to_string(),
            lib_dirs: vec!["libs".to_string()],
            release: "8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LayoutConfig {
    /// Install location of the primary archive inside the distribution.
    pub app_lib_dir: String,
    /// Install location of the raw class files.
    pub tools_classes_dir: String,
    /// Raw distribution resources copied verbatim into the staging tree.
    pub resources_dir: String,
    /// Subtrees holding example content, dropped from release variants.
    pub example_dirs: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            app_lib_dir: "applications/maximo/lib".to_string(),
            tools_classes_dir: "tools/maximo/classes".to_string(),
            resources_dir: "src/main/dist".to_string(),
            example_dirs: vec!["tools/maximo/en".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    pub build_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            build_dir: "build".to_string(),
        }
    }
}

/// Load and validate a `dist.toml`.
pub fn load_config(path: &Path) -> Result<DistConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    let config: DistConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    Ok(config)
}

impl DistConfig {
    pub fn validate(&self) -> Result<()> {
        for (value, field) in [
            (&self.project.product, "project.product"),
            (&self.project.vendor, "project.vendor"),
            (&self.project.version, "project.version"),
        ] {
            if value.trim().is_empty() {
                bail!("{} must not be empty", field);
            }
        }
        if self
            .project
            .product
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            bail!(
                "project.product must be a plain identifier, got '{}'",
                self.project.product
            );
        }

        parse_relative_path(&self.compile.source_dir, "compile.source_dir")?;
        for dir in &self.compile.lib_dirs {
            parse_relative_path(dir, "compile.lib_dirs")?;
        }
        parse_relative_path(&self.layout.app_lib_dir, "layout.app_lib_dir")?;
        parse_relative_path(&self.layout.tools_classes_dir, "layout.tools_classes_dir")?;
        parse_relative_path(&self.layout.resources_dir, "layout.resources_dir")?;
        for dir in &self.layout.example_dirs {
            parse_relative_path(dir, "layout.example_dirs")?;
        }
        parse_relative_path(&self.output.build_dir, "output.build_dir")?;

        Ok(())
    }

    /// Lowercased product identifier, used for the primary archive name.
    pub fn product_lowercase(&self) -> String {
        self.project.product.to_ascii_lowercase()
    }

    /// Distribution base name (without the version suffix).
    pub fn distribution_name(&self) -> String {
        self.project
            .distribution
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| self.product_lowercase())
    }

    /// First path component of the application library dir; the subtree
    /// dropped from release variants.
    pub fn applications_root(&self) -> &str {
        self.layout
            .app_lib_dir
            .split('/')
            .next()
            .unwrap_or(&self.layout.app_lib_dir)
    }
}

fn parse_relative_path(raw: &str, field: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!("{} must not be empty", field);
    }
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        bail!("{} must be relative, got absolute path '{}'", field, raw);
    }
    for component in candidate.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            bail!(
                "{} contains invalid traversal/root component in '{}'",
                field,
                raw
            );
        }
    }
    Ok(candidate.to_path_buf())
}
