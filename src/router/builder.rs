//! Rule descriptor resolution.
//!
//! Turns the textual [`RuleConfig`] descriptors into validated [`Rule`] values.
//! Two compact grammars are expanded here:
//!
//! - node lists: either `node1,node2,node3` or the range form `node(1-10)`,
//!   which expands to `node1..node10` in ascending order.
//! - range boundaries: separator delimited integers with a leading and a
//!   trailing separator, e.g. `-10000-20000-` is `[10000, 20000]`.
//!
//! # Example
//! ```rust
//! use mixer::router::{RuleConfig, build_rule};
//!
//! let rule = build_rule(&RuleConfig {
//!     db: "mixer".into(),
//!     table: "test1".into(),
//!     key: "id".into(),
//!     kind: "hash".into(),
//!     nodes: "node(1-10)".into(),
//!     range: String::new(),
//! })
//! .unwrap();
//! assert_eq!(rule.find_node(11), "node2");
//! ```
use super::{
    ConfigError, RuleConfig,
    rule::{Rule, RuleKind, RuleType},
};

const NODE_SEPARATOR: char = ',';
const RANGE_SEPARATOR: char = '-';
/// Widest `prefix(lo-hi)` span accepted.
const MAX_NODE_SPAN: u64 = u16::MAX as u64;

/// Resolves a single descriptor into a [`Rule`].
pub fn build_rule(cfg: &RuleConfig) -> Result<Rule, ConfigError> {
    let schema = cfg.db.trim();
    if schema.is_empty() {
        return Err(ConfigError::MissingSchema);
    }
    let table = cfg.table.trim();
    let key = cfg.key.trim();

    let rule_type = RuleType::try_from(cfg.kind.as_str()).map_err(ConfigError::UnknownType)?;
    let nodes = parse_nodes(&cfg.nodes)?;

    if table.is_empty() && rule_type != RuleType::Default {
        return Err(ConfigError::SchemaDefaultType {
            schema: schema.to_string(),
            found: rule_type,
        });
    }

    let kind = match rule_type {
        RuleType::Hash => {
            require_key(schema, table, key)?;
            RuleKind::Hash
        }
        RuleType::Range => {
            require_key(schema, table, key)?;
            RuleKind::Range {
                boundaries: parse_range(&cfg.range)?,
            }
        }
        RuleType::Default => RuleKind::Default,
    };
    let key = if rule_type == RuleType::Default { "" } else { key };

    Rule::new(schema, table, key, kind, nodes)
}

fn require_key(schema: &str, table: &str, key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::MissingKey {
            schema: schema.to_string(),
            table: table.to_string(),
        });
    }
    Ok(())
}

/// Expands a node list, either comma separated or in `prefix(lo-hi)` form.
pub fn parse_nodes(nodes: &str) -> Result<Vec<String>, ConfigError> {
    let nodes = nodes.trim();

    if let Some(open) = nodes.find('(') {
        let body = nodes[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| ConfigError::NodeRange(nodes.to_string()))?;
        let prefix = nodes[..open].trim();
        let (lo, hi) = body
            .split_once(RANGE_SEPARATOR)
            .ok_or_else(|| ConfigError::NodeRange(nodes.to_string()))?;
        let lo = lo
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::NodeRange(nodes.to_string()))?;
        let hi = hi
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::NodeRange(nodes.to_string()))?;

        if prefix.is_empty()
            || prefix.contains(NODE_SEPARATOR)
            || lo > hi
            || hi - lo >= MAX_NODE_SPAN
        {
            return Err(ConfigError::NodeRange(nodes.to_string()));
        }

        return Ok((lo..=hi).map(|i| format!("{prefix}{i}")).collect());
    }

    let list = nodes
        .split(NODE_SEPARATOR)
        .map(|n| n.trim().to_string())
        .collect::<Vec<String>>();

    if list.iter().any(|n| n.is_empty()) {
        return Err(ConfigError::NodeList(nodes.to_string()));
    }

    Ok(list)
}

/// Parses a `-b1-b2-...-` boundary string into strictly increasing integers.
pub fn parse_range(range: &str) -> Result<Vec<i64>, ConfigError> {
    let range = range.trim();
    let body = range
        .strip_prefix(RANGE_SEPARATOR)
        .and_then(|r| r.strip_suffix(RANGE_SEPARATOR))
        .ok_or_else(|| ConfigError::Range(range.to_string()))?;

    let mut boundaries: Vec<i64> = Vec::new();
    for part in body.split(RANGE_SEPARATOR) {
        let value = part
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::Range(range.to_string()))?;

        if boundaries.last().is_some_and(|last| *last >= value) {
            return Err(ConfigError::RangeOrder(range.to_string()));
        }
        boundaries.push(value);
    }

    Ok(boundaries)
}
