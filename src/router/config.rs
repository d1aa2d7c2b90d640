use std::{fs, path::Path};

use serde::Deserialize;

use super::ConfigError;

/// Declarative rule descriptor, as found in the `rules` list of a router
/// configuration file.
///
/// An empty `table` together with `type: default` declares the schema's
/// default rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleConfig {
    pub db: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub nodes: String,
    #[serde(default)]
    pub range: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl RouterConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempdir::TempDir;

    use super::*;

    const RULES: &str = r#"{
        "rules": [
            { "db": "mixer", "table": "test1", "key": "id", "type": "hash", "nodes": "node(1-10)" },
            { "db": "mixer", "table": "test2", "key": "name", "type": "range",
              "nodes": "node1,node2,node3", "range": "-10000-20000-" },
            { "db": "mixer", "type": "default", "nodes": "node1" }
        ]
    }"#;

    #[test]
    fn parse_rule_descriptors() {
        let cfg = RouterConfig::from_json(RULES).unwrap();

        assert_eq!(cfg.rules.len(), 3);
        assert_eq!(cfg.rules[0].kind, "hash");
        assert_eq!(cfg.rules[1].range, "-10000-20000-");
        assert_eq!(
            cfg.rules[2],
            RuleConfig {
                db: "mixer".into(),
                kind: "default".into(),
                nodes: "node1".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn load_rules_from_file() {
        let dir = TempDir::new("mixer").unwrap();
        let path = dir.path().join("rules.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(RULES.as_bytes()).unwrap();

        let cfg = RouterConfig::from_path(&path).unwrap();
        assert_eq!(cfg.rules[0].nodes, "node(1-10)");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new("mixer").unwrap();
        let res = RouterConfig::from_path(dir.path().join("missing.json"));

        assert!(matches!(res, Err(ConfigError::Io(_))));
    }

    #[test]
    fn malformed_document_is_config_error() {
        let res = RouterConfig::from_json("{ \"rules\": [ { \"db\": 1 } ] }");

        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }
}
