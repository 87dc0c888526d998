use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use autoscript_dist::script::verify_script;
use autoscript_dist::{clean, load_config, run_build};

const DEFAULT_CONFIG: &str = "dist.toml";

fn usage() -> &'static str {
    "Usage:\n  autoscript-dist build [dist.toml]\n  autoscript-dist clean [dist.toml]\n  autoscript-dist check-script <script.js>"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd] if cmd == "build" => build(Path::new(DEFAULT_CONFIG)),
        [cmd, config] if cmd == "build" => build(Path::new(config)),
        [cmd] if cmd == "clean" => clean_build(Path::new(DEFAULT_CONFIG)),
        [cmd, config] if cmd == "clean" => clean_build(Path::new(config)),
        [cmd, script] if cmd == "check-script" => check_script(Path::new(script)),
        _ => bail!(usage()),
    }
}

fn project_root_for(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn build(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let summary = run_build(&project_root_for(config_path), &config)?;

    println!(
        "[done] compiled {} source file(s), verified {} script(s)",
        summary.sources_compiled, summary.scripts_verified
    );
    println!("[done] {} artifacts:", summary.artifacts.len());
    for artifact in &summary.artifacts {
        println!("  {}", artifact.display());
    }
    Ok(())
}

fn clean_build(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    clean(&project_root_for(config_path), &config)?;
    println!("[clean] removed {}", config.output.build_dir);
    Ok(())
}

fn check_script(path: &Path) -> Result<()> {
    let config = verify_script(path)?;
    println!(
        "[check] '{}' ok: autoscript '{}', version {}, logLevel {}",
        path.display(),
        config.autoscript,
        config.version,
        config.log_level
    );
    Ok(())
}
