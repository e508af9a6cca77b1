//! MB-002: YAML parsing and validation.
//!
//! Parses moby.yml and validates structural constraints:
//! - Every envlist name must be defined at the top level
//! - Environments may not nest deeper than [`MAX_NESTING_DEPTH`]
//! - Unknown keys inside an environment are rejected by the parser itself

use super::error::{MobyError, Result};
use super::types::*;
use std::path::Path;

/// Deepest allowed before/after nesting, counting the top-level node.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a moby.yml file from disk.
pub fn parse_config_file(path: &Path) -> Result<MobyConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MobyError::Configuration(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_config(&content)
}

/// Parse a moby.yml from a string.
pub fn parse_config(yaml: &str) -> Result<MobyConfig> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| MobyError::Configuration(format!("YAML parse error: {}", e)))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &MobyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for name in &config.envlist {
        if config.environment(name).is_none() {
            errors.push(ValidationError {
                message: format!("envlist references unknown environment '{}'", name),
            });
        }
    }

    for (name, env) in &config.environments {
        let depth = env.depth();
        if depth > MAX_NESTING_DEPTH {
            errors.push(ValidationError {
                message: format!(
                    "environment '{}' nests {} levels deep (max {})",
                    name, depth, MAX_NESTING_DEPTH
                ),
            });
        }
    }

    errors
}

/// Parse and validate in one step, folding validation errors into a single
/// configuration error.
pub fn load_config(path: &Path) -> Result<MobyConfig> {
    let config = parse_config_file(path)?;
    let errors = validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Err(MobyError::Configuration(joined.join("; ")))
}

/// Resolve which environments a run should execute.
///
/// An empty `requested` selects the whole envlist. Otherwise only the
/// requested names run, still in envlist order; a requested name that is not
/// in the envlist is an error.
pub fn select_envs(config: &MobyConfig, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(config.envlist.clone());
    }
    if let Some(missing) = requested.iter().find(|r| !config.envlist.contains(*r)) {
        return Err(MobyError::Configuration(format!(
            "environment '{}' is not in envlist",
            missing
        )));
    }
    Ok(config
        .envlist
        .iter()
        .filter(|name| requested.contains(*name))
        .cloned()
        .collect())
}
