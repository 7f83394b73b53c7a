//! Offers every operator of a physical plan to a set of rules, aka a Rule-based optimizer.
//!
//! The rule set only produces alternatives.
//! Choosing between them is left to the caller.
use crate::config::RuleConfig;
use crate::errors::PlanResult;
use crate::plan::{PlanNode, PlanRef};
use crate::rules::{IndexSemiJoinRule, RewriteRule, RuleCtx};

/// A plan produced by a rule, equivalent to the operator it replaces
#[derive(Debug, Clone)]
pub struct Alternative {
    /// The name of the rule that produced it
    pub rule: Box<str>,
    /// The matched operator
    pub original: PlanRef,
    /// The replacement for `original`
    pub rewritten: PlanRef,
}

impl Alternative {
    /// The whole plan `root`, with `original` replaced by `rewritten`
    pub fn apply(&self, root: &PlanRef) -> PlanResult<PlanRef> {
        PlanNode::replace(root, &self.original, &self.rewritten)
    }
}

/// An ordered set of registered rules
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every rule, configured by `config`
    pub fn with_config(config: &RuleConfig) -> Self {
        let mut rules = Self::new();
        for rule in IndexSemiJoinRule::all(config.semijoin) {
            rules.add(rule);
        }
        rules
    }

    pub fn add(&mut self, rule: impl RewriteRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Offers each operator of `root` to each rule, in pre-order and registration order.
    ///
    /// Returns the alternatives the rules produced.
    /// Aborts on the first rule that fails.
    pub fn fire(&self, root: &PlanRef, ctx: &RuleCtx) -> PlanResult<Vec<Alternative>> {
        let mut plans = vec![];
        PlanNode::walk(root, &mut |plan| plans.push(plan.clone()));

        let mut alternatives = vec![];
        for plan in plans {
            for rule in &self.rules {
                let Some(call) = rule.matches(&plan) else {
                    continue;
                };
                log::trace!("{} matches a {} with {} operators", rule.name(), plan.kind(), call.len());
                if let Some(rewritten) = rule.rewrite(call, ctx)? {
                    alternatives.push(Alternative {
                        rule: rule.name().into(),
                        original: plan.clone(),
                        rewritten,
                    });
                }
            }
        }
        Ok(alternatives)
    }
}
