//! Shard routing.
//!
//! This module maps a (schema, table, shard key) triple onto the backend node
//! that owns the row. Routing rules are declared per table as [`RuleConfig`]
//! descriptors, resolved once by the [builder](builder) and stored in an
//! immutable [`Router`].
//!
//! # Overview
//!
//! - [`Rule`]: a resolved hash, range or default partitioning rule.
//! - [`DbRules`]: every rule configured for one schema, plus the optional
//!   schema default rule (a `default` descriptor with an empty table).
//! - [`Router`]: registry of [`DbRules`] keyed by schema name.
//! - [`SharedRouter`]: publishes rebuilt routers to concurrent readers.
//!
//! Lookups never fall back implicitly: [`Router::get_rule`] is an exact
//! match, while [`Router::route`] is the explicit entry point that falls back
//! to the schema default rule.
//!
//! # Example
//! ```rust
//! use mixer::router::{Router, RouterConfig};
//!
//! let cfg = RouterConfig::from_json(r#"{ "rules": [
//!     { "db": "mixer", "table": "test1", "key": "id", "type": "hash", "nodes": "node(1-10)" },
//!     { "db": "mixer", "type": "default", "nodes": "node1" }
//! ] }"#).unwrap();
//! let router = Router::new(&cfg).unwrap();
//!
//! assert_eq!(router.get_rule("mixer", "test1").unwrap().find_node(11), "node2");
//! assert!(router.get_rule("mixer", "test3").is_none());
//! assert_eq!(router.route("mixer", "test3").unwrap().find_node(11), "node1");
//! ```
use std::{collections::HashMap, io};

use log::{info, warn};
use thiserror::Error;

pub mod builder;
pub mod config;
pub mod rule;
mod shared;

pub use builder::{build_rule, parse_nodes, parse_range};
pub use config::{RouterConfig, RuleConfig};
pub use rule::{Rule, RuleKind, RuleType};
pub use shared::SharedRouter;

/// Malformed routing configuration. Always fatal to router construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown rule type '{0}', expected hash, range or default")]
    UnknownType(String),

    #[error("invalid node list '{0}'")]
    NodeList(String),

    #[error("invalid node range '{0}', expected prefix(lo-hi) with lo <= hi")]
    NodeRange(String),

    #[error("invalid range '{0}', expected -b1-b2-...-")]
    Range(String),

    #[error("range boundaries '{0}' are not strictly increasing")]
    RangeOrder(String),

    #[error("range rule with {nodes} nodes needs {} boundaries, got {boundaries}", .nodes.saturating_sub(1))]
    BoundaryCount { nodes: usize, boundaries: usize },

    #[error("rule for '{schema}.{table}' has no nodes")]
    NoNodes { schema: String, table: String },

    #[error("default rule must have exactly one node, got {0}")]
    DefaultNodes(usize),

    #[error("rule is missing a schema name")]
    MissingSchema,

    #[error("rule for '{schema}.{table}' is missing a shard key")]
    MissingKey { schema: String, table: String },

    #[error("schema default rule for '{schema}' must be of type default, got {found}")]
    SchemaDefaultType { schema: String, found: RuleType },

    #[error("failed to read router config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse router config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Rules configured for a single schema.
#[derive(Debug, Clone, Default)]
pub struct DbRules {
    default: Option<Rule>,
    tables: HashMap<String, Rule>,
}

impl DbRules {
    /// Exact table lookup.
    pub fn get_rule(&self, table: &str) -> Option<&Rule> {
        self.tables.get(table)
    }

    /// Schema default rule, if one was declared.
    pub fn default_rule(&self) -> Option<&Rule> {
        self.default.as_ref()
    }

    /// Table rule, falling back to the schema default rule.
    pub fn route(&self, table: &str) -> Option<&Rule> {
        self.get_rule(table).or(self.default.as_ref())
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn insert(&mut self, rule: Rule) -> Option<Rule> {
        if rule.table().is_empty() {
            self.default.replace(rule)
        } else {
            self.tables.insert(rule.table().to_string(), rule)
        }
    }
}

/// Immutable registry of routing rules keyed by schema then table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    schemas: HashMap<String, DbRules>,
}

impl Router {
    /// Builds the registry from rule descriptors. Later descriptors for an
    /// already configured (schema, table) pair replace earlier ones.
    pub fn new(cfg: &RouterConfig) -> Result<Self, ConfigError> {
        Self::from_rules(&cfg.rules)
    }

    pub fn from_rules(rules: &[RuleConfig]) -> Result<Self, ConfigError> {
        let mut schemas: HashMap<String, DbRules> = HashMap::new();

        for cfg in rules {
            let rule = build_rule(cfg)?;
            let (schema, table) = (rule.schema().to_string(), rule.table().to_string());

            if schemas.entry(schema.clone()).or_default().insert(rule).is_some() {
                warn!("duplicate rule for '{schema}.{table}', keeping the last one");
            }
        }

        info!(
            "router built with {} rules across {} schemas",
            rules.len(),
            schemas.len()
        );
        Ok(Self { schemas })
    }

    /// Rules configured for `schema`, if any.
    pub fn get_db_rules(&self, schema: &str) -> Option<&DbRules> {
        self.schemas.get(schema)
    }

    /// Exact (schema, table) lookup. Does not consider the schema default rule.
    pub fn get_rule(&self, schema: &str, table: &str) -> Option<&Rule> {
        self.get_db_rules(schema)?.get_rule(table)
    }

    /// Exact lookup, falling back to the schema default rule.
    pub fn route(&self, schema: &str, table: &str) -> Option<&Rule> {
        self.get_db_rules(schema)?.route(table)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(db: &str, table: &str, kind: &str, nodes: &str, range: &str) -> RuleConfig {
        RuleConfig {
            db: db.into(),
            table: table.into(),
            key: if kind == "default" { "" } else { "id" }.into(),
            kind: kind.into(),
            nodes: nodes.into(),
            range: range.into(),
        }
    }

    fn sample() -> Vec<RuleConfig> {
        vec![
            descriptor("mixer", "test1", "hash", "node(1-10)", ""),
            descriptor("mixer", "test2", "range", "node1,node2,node3", "-10000-20000-"),
            descriptor("mixer", "", "default", "node1", ""),
        ]
    }

    #[test]
    fn router_lookups() {
        let router = Router::from_rules(&sample()).unwrap();

        assert!(router.get_db_rules("mixer").is_some());
        assert!(router.get_db_rules("other").is_none());

        let hash = router.get_rule("mixer", "test1").unwrap();
        assert_eq!(hash.rule_type(), RuleType::Hash);
        assert_eq!(hash.find_node(11), "node2");

        let range = router.get_rule("mixer", "test2").unwrap();
        assert_eq!(range.rule_type(), RuleType::Range);
        assert_eq!(range.find_node(10000), "node2");
    }

    #[test]
    fn get_rule_is_exact() {
        let router = Router::from_rules(&sample()).unwrap();

        assert!(router.get_rule("mixer", "test3").is_none());
        assert!(router.get_rule("other", "test1").is_none());
    }

    #[test]
    fn route_falls_back_to_schema_default() {
        let router = Router::from_rules(&sample()).unwrap();

        let rule = router.route("mixer", "test3").unwrap();
        assert_eq!(rule.rule_type(), RuleType::Default);
        assert_eq!(rule.find_node(11), "node1");

        assert_eq!(router.route("mixer", "test1").unwrap().table(), "test1");
        assert!(router.route("other", "test3").is_none());
    }

    #[test]
    fn route_without_schema_default_misses() {
        let router = Router::from_rules(&sample()[..2]).unwrap();

        assert!(router.get_db_rules("mixer").unwrap().default_rule().is_none());
        assert!(router.route("mixer", "test3").is_none());
    }

    #[test]
    fn explicit_default_table_rule() {
        let mut rules = sample();
        rules.push(descriptor("mixer", "test3", "default", "node7", ""));
        let router = Router::from_rules(&rules).unwrap();

        assert_eq!(router.get_rule("mixer", "test3").unwrap().find_node(1), "node7");
    }

    #[test]
    fn duplicate_rule_last_wins() {
        let mut rules = sample();
        rules.push(descriptor("mixer", "test1", "hash", "node(1-2)", ""));
        let router = Router::from_rules(&rules).unwrap();

        let rule = router.get_rule("mixer", "test1").unwrap();
        assert_eq!(rule.nodes(), ["node1", "node2"]);
        assert_eq!(router.get_db_rules("mixer").unwrap().tables().count(), 2);
    }

    #[test]
    fn invalid_rule_fails_construction() {
        let mut rules = sample();
        rules.push(descriptor("mixer", "test4", "range", "node1,node2,node3", "-10000-"));

        assert!(matches!(
            Router::from_rules(&rules),
            Err(ConfigError::BoundaryCount { .. })
        ));
    }

    #[test]
    fn schemas_are_isolated() {
        let mut rules = sample();
        rules.push(descriptor("audit", "", "default", "node9", ""));
        let router = Router::from_rules(&rules).unwrap();

        let mut schemas = router.schemas().collect::<Vec<_>>();
        schemas.sort();
        assert_eq!(schemas, vec!["audit", "mixer"]);
        assert_eq!(router.route("audit", "test1").unwrap().find_node(1), "node9");
    }

    #[test]
    fn config_error_messages() {
        let err = ConfigError::BoundaryCount {
            nodes: 3,
            boundaries: 1,
        };
        assert_eq!(
            err.to_string(),
            "range rule with 3 nodes needs 2 boundaries, got 1"
        );

        let err = ConfigError::BoundaryCount {
            nodes: 0,
            boundaries: 2,
        };
        assert_eq!(
            err.to_string(),
            "range rule with 0 nodes needs 0 boundaries, got 2"
        );
    }
}
