use crate::plan::{PlanKind, PlanRef};

/// A tree shaped pattern over operator kinds.
///
/// Child operands are matched positionally against a node's inputs.
/// Inputs without an operand are not constrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    kind: PlanKind,
    inputs: Vec<Operand>,
}

impl Operand {
    /// A pattern matching any operator of this kind
    pub fn new(kind: PlanKind) -> Self {
        Self { kind, inputs: vec![] }
    }

    /// Constrains the next input of the matched operator
    pub fn with_input(mut self, operand: Operand) -> Self {
        self.inputs.push(operand);
        self
    }

    /// The number of operators a match binds
    pub fn depth(&self) -> usize {
        1 + self.inputs.iter().map(Self::depth).sum::<usize>()
    }

    /// Matches this pattern against the subtree rooted at `plan`
    pub fn matches(&self, plan: &PlanRef) -> Option<RuleCall> {
        let mut rels = Vec::with_capacity(self.depth());
        self.collect(plan, &mut rels).then_some(RuleCall { rels })
    }

    fn collect(&self, plan: &PlanRef, rels: &mut Vec<PlanRef>) -> bool {
        if plan.kind() != self.kind {
            return false;
        }
        let inputs = plan.inputs();
        if inputs.len() < self.inputs.len() {
            return false;
        }
        rels.push(plan.clone());
        self.inputs
            .iter()
            .zip(inputs)
            .all(|(operand, input)| operand.collect(input, rels))
    }
}

/// The operators bound by a successful match, in pre-order.
///
/// `rels[0]` is the root of the match.
/// The number of operators equals the depth of the pattern that produced it.
#[derive(Debug, Clone)]
pub struct RuleCall {
    pub rels: Vec<PlanRef>,
}

impl RuleCall {
    pub fn root(&self) -> &PlanRef {
        &self.rels[0]
    }

    pub fn rel(&self, i: usize) -> Option<&PlanRef> {
        self.rels.get(i)
    }

    pub fn len(&self) -> usize {
        self.rels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}
