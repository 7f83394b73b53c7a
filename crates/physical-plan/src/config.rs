use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Options for the rewrite rules.
///
/// Every option has a default, so an empty document is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub semijoin: SemiJoinRuleConfig,
}

/// Options for [`crate::rules::IndexSemiJoinRule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemiJoinRuleConfig {
    /// Stop looking for an index once one matches every join key.
    /// Does not change which index is chosen.
    pub early_exit: bool,
    /// Allow adding a probe to a scan that already reads through one
    pub intersect: bool,
}

impl Default for SemiJoinRuleConfig {
    fn default() -> Self {
        Self {
            early_exit: true,
            intersect: true,
        }
    }
}

impl RuleConfig {
    /// Parses a config from a `toml` document
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid rule config")
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to serialize the rule config")
    }
}
