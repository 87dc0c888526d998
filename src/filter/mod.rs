//! Inclusion/exclusion rule sets applied while repacking distributions.
//!
//! A rule set is a named list of exclusion globs compiled into a single
//! matcher. A staged path is included exactly when it matches none of the
//! exclusions, so the same rule set yields the same file list for every
//! archive format.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Directory name used for scratch expansion inside the distributions dir.
pub const SCRATCH_DIR_NAME: &str = "tmp";

/// A named set of exclusion globs.
#[derive(Debug)]
pub struct RuleSet {
    name: String,
    patterns: Vec<String>,
    excludes: GlobSet,
}

impl RuleSet {
    /// Compile a named set of exclusion globs.
    pub fn new(name: &str, patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).with_context(|| {
                format!("invalid exclusion glob '{}' in rule set '{}'", pattern, name)
            })?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .with_context(|| format!("compiling rule set '{}'", name))?;
        Ok(Self {
            name: name.to_string(),
            patterns,
            excludes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when the path (relative to the archive root) survives filtering.
    pub fn includes(&self, relative: &Path) -> bool {
        !self.excludes.is_match(relative)
    }
}

/// Rule set for the full variant: everything ships except scratch markers.
pub fn full_rules() -> Result<RuleSet> {
    RuleSet::new(
        "full",
        vec![
            SCRATCH_DIR_NAME.to_string(),
            format!("{}/**", SCRATCH_DIR_NAME),
        ],
    )
}

/// Rule set for the release variant.
///
/// Excludes the compiled archive by file name, the application-install
/// subtree, and every configured example directory, in addition to the
/// scratch marker.
pub fn release_rules(
    jar_name: &str,
    applications_root: &str,
    example_dirs: &[String],
) -> Result<RuleSet> {
    let mut patterns = vec![
        SCRATCH_DIR_NAME.to_string(),
        format!("{}/**", SCRATCH_DIR_NAME),
        format!("**/{}", jar_name),
        applications_root.to_string(),
        format!("{}/**", applications_root),
    ];
    for dir in example_dirs {
        let dir = dir.trim_end_matches('/');
        patterns.push(dir.to_string());
        patterns.push(format!("{}/**", dir));
    }
    RuleSet::new("release", patterns)
}
