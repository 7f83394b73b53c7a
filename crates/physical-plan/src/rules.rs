//! This module defines the rewrite rules used for query optimization.
//!
//! These include:
//!
//! * [IndexSemiJoinRule]
//!     Replace the full read of a semijoin's lhs scan with an index search on the join keys
use std::{iter, sync::Arc};

use colstore_primitives::ColId;

use crate::config::SemiJoinRuleConfig;
use crate::errors::{PlanError, PlanResult};
use crate::ix_select::select_index;
use crate::params::ParamAllocator;
use crate::pattern::{Operand, RuleCall};
use crate::plan::{IxScan, PhysicalPlan, PlanKind, PlanNode, PlanRef, TableScan};
use crate::probe::{add_probe, search_keys};

/// A plan to plan transformation.
///
/// A rule never modifies the plan it matched.
/// It returns an equivalent plan to be registered next to it,
/// or `None` if it does not apply.
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, plan: &PlanRef) -> Option<RuleCall>;
    fn rewrite(&self, call: RuleCall, ctx: &RuleCtx) -> PlanResult<Option<PlanRef>>;
}

/// The services a rewrite may use
#[derive(Clone, Copy)]
pub struct RuleCtx<'a> {
    pub params: &'a dyn ParamAllocator,
}

impl<'a> RuleCtx<'a> {
    pub fn new(params: &'a dyn ParamAllocator) -> Self {
        Self { params }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SemiJoinPattern {
    /// semijoin -> scan
    Scan,
    /// semijoin -> scan -> intersect
    ScanIntersect,
    /// semijoin -> scan -> merge -> search
    ScanMerge,
}

/// Match a semijoin whose lhs is a table scan:
///
/// ```text
/// SemiJoin(lhs_keys = rhs_keys)
///   TableScan t
///   <rhs>
/// ```
///
/// Rewrite it as a scan of `t` that only reads the row ids
/// an unclustered index of `t` returns for the rhs keys:
///
/// ```text
/// TableScan t
///   IxMerge
///     IxSearch t.ix
///       Sort(distinct)
///         Project(rhs_keys)
///           Filter(rhs_keys is not null)
///             <rhs>
/// ```
///
/// If the scan already reads through an index probe,
/// the new probe is intersected with it.
/// The rule is registered once per shape of the scan's input.
#[derive(Debug, Clone)]
pub struct IndexSemiJoinRule {
    pattern: SemiJoinPattern,
    operand: Operand,
    config: SemiJoinRuleConfig,
}

impl IndexSemiJoinRule {
    fn new(pattern: SemiJoinPattern, config: SemiJoinRuleConfig) -> Self {
        let scan = Operand::new(PlanKind::TableScan);
        let scan = match pattern {
            SemiJoinPattern::Scan => scan,
            SemiJoinPattern::ScanIntersect => scan.with_input(Operand::new(PlanKind::IxIntersect)),
            SemiJoinPattern::ScanMerge => {
                scan.with_input(Operand::new(PlanKind::IxMerge).with_input(Operand::new(PlanKind::IxSearch)))
            }
        };
        Self {
            pattern,
            operand: Operand::new(PlanKind::SemiJoin).with_input(scan),
            config,
        }
    }

    /// semijoin -> scan
    pub fn scan(config: SemiJoinRuleConfig) -> Self {
        Self::new(SemiJoinPattern::Scan, config)
    }

    /// semijoin -> scan -> intersect
    pub fn scan_intersect(config: SemiJoinRuleConfig) -> Self {
        Self::new(SemiJoinPattern::ScanIntersect, config)
    }

    /// semijoin -> scan -> merge -> search
    pub fn scan_merge(config: SemiJoinRuleConfig) -> Self {
        Self::new(SemiJoinPattern::ScanMerge, config)
    }

    /// Every registration of this rule
    pub fn all(config: SemiJoinRuleConfig) -> [Self; 3] {
        [Self::scan(config), Self::scan_intersect(config), Self::scan_merge(config)]
    }

    /// Matches and rewrites `plan` in one step
    pub fn try_rewrite(&self, plan: &PlanRef, ctx: &RuleCtx) -> PlanResult<Option<PlanRef>> {
        match self.matches(plan) {
            Some(call) => self.rewrite(call, ctx),
            None => Ok(None),
        }
    }

    /// Does a more specific registration handle this scan?
    fn defers(&self, scan: &TableScan) -> bool {
        self.pattern == SemiJoinPattern::Scan
            && ((scan.inputs.len() == 1 && !scan.has_extra_filter) || scan.probe().is_some())
    }
}

impl RewriteRule for IndexSemiJoinRule {
    fn name(&self) -> &str {
        match self.pattern {
            SemiJoinPattern::Scan => "IndexSemiJoinRule(scan)",
            SemiJoinPattern::ScanIntersect => "IndexSemiJoinRule(scan, intersect)",
            SemiJoinPattern::ScanMerge => "IndexSemiJoinRule(scan, merge, search)",
        }
    }

    fn matches(&self, plan: &PlanRef) -> Option<RuleCall> {
        self.operand.matches(plan)
    }

    fn rewrite(&self, call: RuleCall, ctx: &RuleCtx) -> PlanResult<Option<PlanRef>> {
        let (Some(join), Some(lhs)) = (call.rel(0), call.rel(1)) else {
            return Ok(None);
        };
        let (PhysicalPlan::SemiJoin(join), PhysicalPlan::TableScan(scan)) = (join.plan(), lhs.plan()) else {
            return Ok(None);
        };
        let table = &scan.schema.table_name;

        if self.defers(scan) {
            log::debug!("{}: deferring scan of `{table}` to a longer pattern", self.name());
            return Ok(None);
        }
        let existing = match self.pattern {
            SemiJoinPattern::Scan => None,
            _ if !self.config.intersect => {
                log::debug!("{}: intersecting index probes is disabled", self.name());
                return Ok(None);
            }
            _ => match (call.rel(2), scan.inputs.first()) {
                (Some(probe), Some(first)) if Arc::ptr_eq(probe, first) => Some(probe),
                _ => return Err(PlanError::malformed(table, "matched probe is not the scan's row id source")),
            },
        };

        let join_cols = join
            .lhs_keys
            .iter()
            .map(|pos| {
                scan.table_column(pos.idx()).ok_or(PlanError::FieldOutOfRange {
                    pos: pos.idx(),
                    nfields: lhs.nfields(),
                })
            })
            .collect::<PlanResult<Vec<ColId>>>()?;
        for index in scan.schema.unclustered_indexes() {
            scan.schema.validate_index(index)?;
        }

        let Some(choice) = select_index(scan.schema.unclustered_indexes(), &join_cols, self.config.early_exit) else {
            log::debug!("{}: no index on `{table}` matches the join keys", self.name());
            return Ok(None);
        };
        log::debug!(
            "{}: probing `{table}` through index `{}` with {} of {} join keys, permuted as {:?}",
            self.name(),
            choice.index.index_name,
            choice.key_match.len(),
            join_cols.len(),
            choice.key_match.permutation,
        );

        let keys = search_keys(join, lhs.row_type(), &choice.key_match)?;
        let index = IxScan {
            schema: scan.schema.clone(),
            index_id: choice.index.index_id,
            connection: scan.connection,
        };
        let probe = add_probe(existing, keys, index, ctx.params)?;

        PlanNode::new(TableScan {
            inputs: iter::once(probe).chain(scan.residual_inputs().iter().cloned()).collect(),
            ..scan.clone()
        })
        .map(Some)
    }
}
