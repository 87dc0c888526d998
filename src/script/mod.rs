//! Automation-script configuration verification.
//!
//! Every automation script carries an embedded `scriptConfig` JSON object
//! that the host platform reads when registering the script. The verify
//! stage parses and validates that object for each script shipped in the
//! distribution resources, so a broken script never reaches an archive.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Accepted `logLevel` values, matched case-insensitively.
pub const LOG_LEVELS: &[&str] = &["NONE", "ERROR", "WARN", "INFO", "DEBUG"];

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_active() -> bool {
    true
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// The `scriptConfig` object embedded in an automation script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    /// The automation script name.
    #[serde(default)]
    pub autoscript: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub auto_script_vars: Vec<AutoscriptVar>,
    #[serde(default)]
    pub script_launch_points: Vec<ScriptLaunchPoint>,
    #[serde(default)]
    pub allow_invoking_script_functions: bool,
}

impl ScriptConfig {
    /// Basic sanity checks for the provided values.
    pub fn validate(&self) -> Result<()> {
        if self.autoscript.is_empty() {
            bail!("scriptConfig must provide the autoscript attribute");
        }
        if !LOG_LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(&self.log_level))
        {
            bail!(
                "scriptConfig logLevel '{}' is not one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        for var in &self.auto_script_vars {
            var.validate()?;
        }
        for launch_point in &self.script_launch_points {
            launch_point.validate()?;
        }
        Ok(())
    }
}

/// One entry of the `autoScriptVars` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscriptVar {
    #[serde(default)]
    pub varname: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub var_binding_type: String,
    #[serde(default)]
    pub literal_data_type: Option<String>,
    #[serde(default)]
    pub var_binding_value: Option<String>,
    #[serde(default)]
    pub var_type: String,
    #[serde(default)]
    pub allow_override: bool,
    #[serde(default)]
    pub no_validation: bool,
    #[serde(default)]
    pub no_access_check: bool,
    #[serde(default)]
    pub no_action: bool,
}

impl AutoscriptVar {
    pub fn validate(&self) -> Result<()> {
        if self.varname.is_empty() {
            bail!("scriptConfig.autoScriptVars must provide the varname attribute");
        }
        if self.var_type.is_empty() {
            bail!("scriptConfig.autoScriptVars must provide the varType attribute");
        }
        if self.var_binding_type.is_empty() {
            bail!("scriptConfig.autoScriptVars must provide the varBindingType attribute");
        }

        let binding = self.var_binding_type.as_str();
        if binding.eq_ignore_ascii_case("LITERAL")
            && self
                .literal_data_type
                .as_deref()
                .map_or(true, str::is_empty)
        {
            bail!("scriptConfig.autoScriptVars must provide the literalDataType attribute");
        }
        if ["MAXVAR", "LITERAL", "SYSPROP"]
            .iter()
            .any(|t| binding.eq_ignore_ascii_case(t))
            && self
                .var_binding_value
                .as_deref()
                .map_or(true, str::is_empty)
        {
            bail!("scriptConfig.autoScriptVars must provide the varBindingValue attribute");
        }
        Ok(())
    }
}

/// One entry of the `scriptLaunchPoints` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLaunchPoint {
    #[serde(default)]
    pub launch_point_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub launch_point_type: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub attribute_name: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub initialize_value: bool,
    #[serde(default)]
    pub validate_application: bool,
    #[serde(default)]
    pub allow_object_creation: bool,
    #[serde(default)]
    pub allow_object_deletion: bool,
    #[serde(default)]
    pub save: bool,
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub before_save: bool,
    #[serde(default)]
    pub after_save: bool,
    #[serde(default)]
    pub after_commit: bool,
    #[serde(default)]
    pub initialize_access_restriction: bool,
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub retrieve_list: bool,
    #[serde(default)]
    pub run_action: bool,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub launch_point_vars: Vec<LaunchPointVar>,
}

impl ScriptLaunchPoint {
    pub fn validate(&self) -> Result<()> {
        if self.launch_point_name.is_empty() {
            bail!("scriptConfig.scriptLaunchPoints must provide the launchPointName attribute");
        }
        if self.launch_point_type.is_empty() {
            bail!("scriptConfig.scriptLaunchPoints must provide the launchPointType attribute");
        }

        let kind = self.launch_point_type.as_str();
        let is_object = kind.eq_ignore_ascii_case("OBJECT");
        let is_attribute = kind.eq_ignore_ascii_case("ATTRIBUTE");
        let is_action = kind.eq_ignore_ascii_case("ACTION");

        if (is_object || is_attribute)
            && self.object_name.as_deref().map_or(true, str::is_empty)
        {
            bail!("scriptConfig.scriptLaunchPoints must provide the objectName attribute");
        }
        if is_attribute && self.attribute_name.as_deref().map_or(true, str::is_empty) {
            bail!("scriptConfig.scriptLaunchPoints must provide the attributeName attribute");
        }
        if is_action && self.action_name.as_deref().map_or(true, str::is_empty) {
            bail!("scriptConfig.scriptLaunchPoints must provide the actionName attribute");
        }

        if is_object {
            if !self.initialize_value
                && !self.validate_application
                && !self.allow_object_deletion
                && !self.allow_object_creation
                && !self.save
            {
                bail!(
                    "for an object launch point one of the following must be true: \
                     initializeValue, validateApplication, allowObjectDeletion, \
                     allowObjectCreation or save"
                );
            }
            if self.save {
                if !self.add && !self.update && !self.delete {
                    bail!(
                        "for an object launch point with the save action one of the \
                         following must be true: add, update or delete"
                    );
                }
                if !self.before_save && !self.after_save && !self.after_commit {
                    bail!(
                        "for an object launch point with the save action one of the \
                         following must be true: beforeSave, afterSave or afterCommit"
                    );
                }
            }
        }

        if is_attribute
            && !self.initialize_access_restriction
            && !self.initialize_value
            && !self.validate
            && !self.retrieve_list
            && !self.run_action
        {
            bail!(
                "for an attribute launch point one of the following must be true: \
                 initializeAccessRestriction, initializeValue, validate, retrieveList \
                 or runAction"
            );
        }

        for var in &self.launch_point_vars {
            var.validate()?;
        }
        Ok(())
    }
}

/// One entry of the `launchPointVars` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPointVar {
    #[serde(default)]
    pub var_name: String,
    #[serde(default)]
    pub var_binding_value: Option<String>,
}

impl LaunchPointVar {
    pub fn validate(&self) -> Result<()> {
        if self.var_name.is_empty() {
            bail!("scriptConfig.launchPointVars must provide the varName attribute");
        }
        if self
            .var_binding_value
            .as_deref()
            .map_or(true, str::is_empty)
        {
            bail!("scriptConfig.launchPointVars must provide the varBindingValue attribute");
        }
        Ok(())
    }
}

/// Extract the embedded `scriptConfig` JSON object from script source text.
pub fn extract_script_config(source: &str) -> Result<ScriptConfig> {
    let marker = source
        .find("scriptConfig")
        .ok_or_else(|| anyhow!("script does not declare a scriptConfig object"))?;
    let after_marker = &source[marker..];
    let brace = after_marker
        .find('{')
        .ok_or_else(|| anyhow!("scriptConfig declaration has no JSON object"))?;
    let json = balanced_object(&after_marker[brace..])
        .ok_or_else(|| anyhow!("scriptConfig JSON object is unterminated"))?;
    serde_json::from_str(json).context("parsing scriptConfig JSON")
}

/// Slice the balanced `{...}` object starting at the first byte of `text`,
/// honoring string literals and escapes.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse and validate the configuration of one script file.
pub fn verify_script(path: &Path) -> Result<ScriptConfig> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;
    let config = extract_script_config(&source)
        .with_context(|| format!("script '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("script '{}'", path.display()))?;
    Ok(config)
}

/// Verify every `.js` script under the resources tree, in sorted order.
/// Returns the number of scripts checked.
pub fn verify_scripts(resources_dir: &Path) -> Result<usize> {
    if !resources_dir.is_dir() {
        return Ok(0);
    }

    let mut scripts: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(resources_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", resources_dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("js")
        {
            scripts.push(entry.into_path());
        }
    }
    scripts.sort();

    for script in &scripts {
        verify_script(script)?;
    }
    Ok(scripts.len())
}
