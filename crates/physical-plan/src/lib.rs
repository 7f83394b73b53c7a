//! Physical plans for the column store, and the rules that rewrite them.
//!
//! The main rule is [`rules::IndexSemiJoinRule`], which replaces a semijoin
//! over a table scan with an index probe that feeds the scan its row ids.
pub mod config;
pub mod errors;
pub mod expr;
pub mod ix_select;
pub mod optimize;
pub mod params;
pub mod pattern;
pub mod plan;
pub mod printer;
pub mod probe;
pub mod rules;

#[cfg(test)]
mod testing;

pub use config::{RuleConfig, SemiJoinRuleConfig};
pub use errors::{PlanError, PlanResult};
pub use optimize::{Alternative, RuleSet};
pub use params::{AtomicParamAllocator, ParamAllocator, SharedParams};
pub use plan::{PhysicalPlan, PlanKind, PlanNode, PlanRef};
pub use rules::{IndexSemiJoinRule, RewriteRule, RuleCtx};
