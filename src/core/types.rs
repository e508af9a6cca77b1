//! MB-001: Configuration and result types.
//!
//! Defines the moby.yml schema: an ordered `envlist` plus one environment
//! definition per name. Environments nest through `before` and `after`.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level moby.yml
// ============================================================================

/// Root configuration: which environments to run, and what they are.
#[derive(Debug, Clone, Serialize)]
pub struct MobyConfig {
    /// Environment names, executed in this order
    pub envlist: Vec<String>,

    /// Every other top-level key is an environment (order-preserving)
    #[serde(flatten)]
    pub environments: IndexMap<String, EnvironmentSpec>,
}

// Each environment deserializes straight from the document, so plain
// scalars such as `true` or `2024` stay valid command and path strings.
impl<'de> Deserialize<'de> for MobyConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ConfigVisitor)
    }
}

struct ConfigVisitor;

impl<'de> Visitor<'de> for ConfigVisitor {
    type Value = MobyConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of `envlist` and environment definitions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<MobyConfig, A::Error> {
        let mut envlist: Option<Vec<String>> = None;
        let mut environments = IndexMap::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == "envlist" {
                if envlist.is_some() {
                    return Err(de::Error::duplicate_field("envlist"));
                }
                envlist = Some(map.next_value()?);
                continue;
            }
            let spec: EnvironmentSpec = map.next_value()?;
            if environments.insert(key.clone(), spec).is_some() {
                return Err(de::Error::custom(format!("duplicate environment '{}'", key)));
            }
        }
        let envlist = envlist.ok_or_else(|| de::Error::missing_field("envlist"))?;
        Ok(MobyConfig {
            envlist,
            environments,
        })
    }
}

impl MobyConfig {
    /// Look up a top-level environment by name.
    pub fn environment(&self, name: &str) -> Option<&EnvironmentSpec> {
        self.environments.get(name)
    }
}

// ============================================================================
// Environments
// ============================================================================

/// A staged command sequence.
///
/// Phases run in the fixed order before → push → run → pull → after.
/// A phase whose key is absent is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    /// Environment run to completion before this one starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Box<EnvironmentSpec>>,

    /// Host paths uploaded to the container's working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<Vec<String>>,

    /// Commands executed in the container, in order
    #[serde(default)]
    pub run: Vec<String>,

    /// Container paths downloaded into the host's working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull: Option<Vec<String>>,

    /// Environment run after this one's pull phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Box<EnvironmentSpec>>,
}

impl EnvironmentSpec {
    /// Number of nested levels, counting this node as 1.
    pub fn depth(&self) -> usize {
        let before = self.before.as_deref().map_or(0, Self::depth);
        let after = self.after.as_deref().map_or(0, Self::depth);
        1 + before.max(after)
    }

    /// Commands in the order a run would execute them, nested phases included.
    pub fn flattened_commands(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_commands(&mut out);
        out
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(before) = &self.before {
            before.collect_commands(out);
        }
        out.extend(self.run.iter().map(String::as_str));
        if let Some(after) = &self.after {
            after.collect_commands(out);
        }
    }
}

impl fmt::Display for EnvironmentSpec {
    /// One-line phase summary, e.g. `before, push(2), run(3), pull(1)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.before.is_some() {
            parts.push("before".to_string());
        }
        if let Some(push) = &self.push {
            parts.push(format!("push({})", push.len()));
        }
        parts.push(format!("run({})", self.run.len()));
        if let Some(pull) = &self.pull {
            parts.push(format!("pull({})", pull.len()));
        }
        if self.after.is_some() {
            parts.push("after".to_string());
        }
        write!(f, "{}", parts.join(", "))
    }
}

// ============================================================================
// Command result
// ============================================================================

/// Output of one successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    /// All streamed chunks concatenated, trailing whitespace trimmed
    pub output: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mb001_config_parse() {
        let yaml = r#"
envlist: [test, docs]
test:
  before:
    run: ["pip install -e ."]
  push: [src, setup.py]
  run: [pytest]
  pull: [coverage.xml]
docs:
  run: ["make html"]
"#;
        let config: MobyConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.envlist, vec!["test", "docs"]);
        assert_eq!(config.environments.len(), 2);
        let test = config.environment("test").unwrap();
        assert_eq!(test.push.as_deref(), Some(&["src".to_string(), "setup.py".to_string()][..]));
        assert_eq!(test.run, vec!["pytest"]);
        assert_eq!(test.before.as_ref().unwrap().run, vec!["pip install -e ."]);
        assert!(test.after.is_none());
    }

    #[test]
    fn test_mb001_environment_order_preserved() {
        let yaml = r#"
envlist: []
zeta: {}
alpha: {}
mid: {}
"#;
        let config: MobyConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let names: Vec<_> = config.environments.keys().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_mb001_run_defaults_empty() {
        let spec: EnvironmentSpec = serde_yaml_ng::from_str("push: [a.txt]").unwrap();
        assert!(spec.run.is_empty());
        assert!(spec.pull.is_none());
    }

    #[test]
    fn test_mb001_presence_not_truthiness() {
        // An empty list is present; a missing key is not.
        let spec: EnvironmentSpec = serde_yaml_ng::from_str("push: []").unwrap();
        assert_eq!(spec.push, Some(vec![]));
        let spec: EnvironmentSpec = serde_yaml_ng::from_str("run: []").unwrap();
        assert_eq!(spec.push, None);
    }

    #[test]
    fn test_mb001_unknown_key_rejected() {
        let result = serde_yaml_ng::from_str::<EnvironmentSpec>("runs: [make]");
        assert!(result.is_err());
    }

    #[test]
    fn test_mb001_depth() {
        let leaf = EnvironmentSpec::default();
        assert_eq!(leaf.depth(), 1);
        let spec: EnvironmentSpec = serde_yaml_ng::from_str(
            r#"
before:
  before:
    run: [a]
after:
  run: [c]
"#,
        )
        .unwrap();
        assert_eq!(spec.depth(), 3);
    }

    #[test]
    fn test_mb001_flattened_commands() {
        let spec: EnvironmentSpec = serde_yaml_ng::from_str(
            r#"
before:
  before:
    run: [a1]
  run: [a2]
  after:
    run: [a3]
run: [b1, b2]
after:
  run: [c]
"#,
        )
        .unwrap();
        assert_eq!(spec.flattened_commands(), vec!["a1", "a2", "a3", "b1", "b2", "c"]);
    }

    #[test]
    fn test_mb001_display_summary() {
        let spec: EnvironmentSpec = serde_yaml_ng::from_str(
            r#"
before: {run: [x]}
push: [a, b]
run: [one, two, three]
pull: [out]
"#,
        )
        .unwrap();
        assert_eq!(spec.to_string(), "before, push(2), run(3), pull(1)");
        assert_eq!(EnvironmentSpec::default().to_string(), "run(0)");
    }

    #[test]
    fn test_mb001_yaml_anchor_expands_to_copy() {
        let yaml = r#"
envlist: [b]
a: &setup
  run: [setup]
b:
  before: *setup
  run: [main]
"#;
        let config: MobyConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let b = config.environment("b").unwrap();
        assert_eq!(b.flattened_commands(), vec!["setup", "main"]);
    }
}
