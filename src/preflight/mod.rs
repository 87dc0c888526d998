//! Host-tool preflight checks.
//!
//! The compile stage shells out to the host `javac`; resolving it before
//! the pipeline starts turns a mid-build spawn failure into a clear
//! diagnostic up front. The platform jars themselves are checked later,
//! at classpath assembly.

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Tools the pipeline shells out to, with what provides each.
pub const REQUIRED_TOOLS: &[(&str, &str)] =
    &[("javac", "a Java Development Kit (JDK), release 8 or later")];

/// Resolve a tool on the host PATH.
pub fn find_tool(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}

/// Verify that every tool in [`REQUIRED_TOOLS`] resolves on PATH.
pub fn check_host_tools() -> Result<()> {
    check_tools(REQUIRED_TOOLS)
}

fn check_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| find_tool(tool).is_none())
        .map(|(tool, provider)| format!("  {} (install: {})", tool, provider))
        .collect();

    if !missing.is_empty() {
        bail!("missing required host tools:\n{}", missing.join("\n"));
    }
    Ok(())
}
