use std::fmt;

use super::ConfigError;

/// Partitioning scheme of a [`Rule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// `key mod nodes.len()`
    Hash,
    /// Ordered boundaries; boundary `i` is the lowest key owned by node `i + 1`.
    Range { boundaries: Vec<i64> },
    /// Every key lands on the single configured node.
    Default,
}

/// Short name of a rule kind as written in rule descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Hash,
    Range,
    Default,
}

impl TryFrom<&str> for RuleType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "hash" => Ok(RuleType::Hash),
            "range" => Ok(RuleType::Range),
            "default" => Ok(RuleType::Default),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleType::Hash => "hash",
            RuleType::Range => "range",
            RuleType::Default => "default",
        };
        write!(f, "{name}")
    }
}

/// Resolved routing rule for one (schema, table) pair.
///
/// [`Rule::new`] is the only constructor, so every rule has at least one node,
/// a range rule carries exactly `nodes.len() - 1` strictly increasing
/// boundaries and a default rule has a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    schema: String,
    table: String,
    key: String,
    kind: RuleKind,
    nodes: Vec<String>,
}

impl Rule {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        key: impl Into<String>,
        kind: RuleKind,
        nodes: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let (schema, table) = (schema.into(), table.into());

        if nodes.is_empty() {
            return Err(ConfigError::NoNodes { schema, table });
        }
        match &kind {
            RuleKind::Hash => {}
            RuleKind::Range { boundaries } => {
                if boundaries.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ConfigError::RangeOrder(format!("{boundaries:?}")));
                }
                if boundaries.len() + 1 != nodes.len() {
                    return Err(ConfigError::BoundaryCount {
                        nodes: nodes.len(),
                        boundaries: boundaries.len(),
                    });
                }
            }
            RuleKind::Default => {
                if nodes.len() != 1 {
                    return Err(ConfigError::DefaultNodes(nodes.len()));
                }
            }
        }

        Ok(Self {
            schema,
            table,
            key: key.into(),
            kind,
            nodes,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table name; empty for a schema default rule.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Shard key column; empty for default rules.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn rule_type(&self) -> RuleType {
        match self.kind {
            RuleKind::Hash => RuleType::Hash,
            RuleKind::Range { .. } => RuleType::Range,
            RuleKind::Default => RuleType::Default,
        }
    }

    /// Resolves a shard key value to the node that owns it.
    pub fn find_node(&self, key: i64) -> &str {
        let index = match &self.kind {
            // Unsigned modulo; negative keys wrap the same way on every call.
            RuleKind::Hash => ((key as u64) % self.nodes.len() as u64) as usize,
            RuleKind::Range { boundaries } => boundaries.partition_point(|b| *b <= key),
            RuleKind::Default => 0,
        };
        &self.nodes[index]
    }
}
