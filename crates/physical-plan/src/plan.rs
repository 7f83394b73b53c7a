use std::{fmt, ops::Deref, sync::Arc};

use colstore_primitives::{ColId, ColList, ConnectionId, IndexId, ParamId};
use colstore_schema::schema::{IndexSchema, TableSchema};
use colstore_schema::types::{AlgebraicType, ProductType, ProductTypeElement};
use derive_more::From;

use crate::errors::{PlanError, PlanResult};
use crate::expr::PhysicalExpr;
use crate::params::SharedParams;

/// A shared, immutable reference to an operator.
///
/// Rewrites never mutate a node. They build new nodes that share the untouched inputs.
pub type PlanRef = Arc<PlanNode>;

/// The kind of an operator, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    SemiJoin,
    TableScan,
    IxSearch,
    IxMerge,
    IxIntersect,
    Project,
    Sort,
    Filter,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A physical operator together with its resolved row type.
///
/// The row type is computed once, when the node is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    plan: PhysicalPlan,
    row_type: ProductType,
}

impl Deref for PlanNode {
    type Target = PhysicalPlan;

    fn deref(&self) -> &Self::Target {
        &self.plan
    }
}

impl PlanNode {
    /// Resolves the row type of `plan` and wraps it in a [`PlanRef`].
    ///
    /// Fails if the operator references a field, column or index that its inputs or table do not have.
    pub fn new(plan: impl Into<PhysicalPlan>) -> PlanResult<PlanRef> {
        let plan = plan.into();
        let row_type = plan.derive_row_type()?;
        Ok(Arc::new(Self { plan, row_type }))
    }

    pub fn plan(&self) -> &PhysicalPlan {
        &self.plan
    }

    pub fn row_type(&self) -> &ProductType {
        &self.row_type
    }

    pub fn nfields(&self) -> usize {
        self.row_type.len()
    }

    /// Walks the plan tree and calls `f` on every op
    pub fn visit(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        for input in self.inputs() {
            input.visit(f);
        }
    }

    /// Is there any subplan where `f` returns true?
    pub fn any(&self, f: &impl Fn(&Self) -> bool) -> bool {
        let mut ok = false;
        self.visit(&mut |plan| {
            ok = ok || f(plan);
        });
        ok
    }

    /// Like [`Self::visit`], but hands out the shared references,
    /// so that `f` may keep or compare them.
    pub fn walk(plan: &PlanRef, f: &mut impl FnMut(&PlanRef)) {
        f(plan);
        for input in plan.inputs() {
            Self::walk(input, f);
        }
    }

    /// Rebuilds this operator over new inputs
    pub fn with_inputs(&self, inputs: Vec<PlanRef>) -> PlanResult<PlanRef> {
        Self::new(self.plan.with_inputs(&inputs)?)
    }

    /// Returns a copy of `root` where the subtree `target` is replaced by `with`.
    ///
    /// Subtrees are compared by identity, not by value.
    /// Operators that do not contain `target` are shared with `root`, not copied.
    pub fn replace(root: &PlanRef, target: &PlanRef, with: &PlanRef) -> PlanResult<PlanRef> {
        if Arc::ptr_eq(root, target) {
            return Ok(with.clone());
        }
        let inputs = root.inputs();
        let replaced = inputs
            .iter()
            .map(|input| Self::replace(input, target, with))
            .collect::<PlanResult<Vec<_>>>()?;
        if inputs.iter().zip(&replaced).all(|(old, new)| Arc::ptr_eq(old, new)) {
            return Ok(root.clone());
        }
        root.with_inputs(replaced)
    }
}

/// A physical operator
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum PhysicalPlan {
    /// Rows of the lhs with at least one match in the rhs
    SemiJoin(SemiJoin),
    /// Read the rows of a table, optionally restricted by row id inputs
    TableScan(TableScan),
    /// Look up search keys in an index, returning row ids
    IxSearch(IxSearch),
    /// Reassemble row ids from an index search in row id order
    IxMerge(IxMerge),
    /// The intersection of the row ids of several merges
    IxIntersect(IxIntersect),
    /// Compute a list of expressions for each row
    Project(Project),
    /// Sort rows, optionally discarding duplicates
    Sort(Sort),
    /// A tuple-at-a-time filter
    Filter(Filter),
}

impl PhysicalPlan {
    pub fn kind(&self) -> PlanKind {
        match self {
            Self::SemiJoin(_) => PlanKind::SemiJoin,
            Self::TableScan(_) => PlanKind::TableScan,
            Self::IxSearch(_) => PlanKind::IxSearch,
            Self::IxMerge(_) => PlanKind::IxMerge,
            Self::IxIntersect(_) => PlanKind::IxIntersect,
            Self::Project(_) => PlanKind::Project,
            Self::Sort(_) => PlanKind::Sort,
            Self::Filter(_) => PlanKind::Filter,
        }
    }

    /// The inputs of this operator, in order
    pub fn inputs(&self) -> Vec<&PlanRef> {
        match self {
            Self::SemiJoin(SemiJoin { lhs, rhs, .. }) => vec![lhs, rhs],
            Self::TableScan(TableScan { inputs, .. }) | Self::IxIntersect(IxIntersect { inputs, .. }) => {
                inputs.iter().collect()
            }
            Self::IxSearch(IxSearch { input, .. })
            | Self::IxMerge(IxMerge { input, .. })
            | Self::Project(Project { input, .. })
            | Self::Sort(Sort { input, .. })
            | Self::Filter(Filter { input, .. }) => vec![input],
        }
    }

    /// Is this operator a row id source for a table scan?
    pub fn is_probe(&self) -> bool {
        matches!(self, Self::IxMerge(_) | Self::IxIntersect(_))
    }

    fn with_inputs(&self, inputs: &[PlanRef]) -> PlanResult<Self> {
        Ok(match (self, inputs) {
            (Self::SemiJoin(join), [lhs, rhs]) => SemiJoin {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
                ..join.clone()
            }
            .into(),
            (Self::TableScan(scan), _) => TableScan {
                inputs: inputs.to_vec(),
                ..scan.clone()
            }
            .into(),
            (Self::IxIntersect(intersect), _) => IxIntersect {
                inputs: inputs.to_vec(),
                ..intersect.clone()
            }
            .into(),
            (Self::IxSearch(search), [input]) => IxSearch {
                input: input.clone(),
                ..search.clone()
            }
            .into(),
            (Self::IxMerge(merge), [input]) => IxMerge {
                input: input.clone(),
                ..merge.clone()
            }
            .into(),
            (Self::Project(project), [input]) => Project {
                input: input.clone(),
                ..project.clone()
            }
            .into(),
            (Self::Sort(sort), [input]) => Sort {
                input: input.clone(),
                ..sort.clone()
            }
            .into(),
            (Self::Filter(filter), [input]) => Filter {
                input: input.clone(),
                ..filter.clone()
            }
            .into(),
            (plan, found) => {
                return Err(PlanError::InputArity {
                    kind: plan.kind(),
                    expected: plan.inputs().len(),
                    found: found.len(),
                })
            }
        })
    }

    fn derive_row_type(&self) -> PlanResult<ProductType> {
        match self {
            Self::SemiJoin(join) => {
                if join.lhs_keys.len() != join.rhs_keys.len() {
                    return Err(PlanError::JoinKeyArity {
                        lhs: join.lhs_keys.len(),
                        rhs: join.rhs_keys.len(),
                    });
                }
                check_positions(&join.lhs_keys, join.lhs.row_type())?;
                check_positions(&join.rhs_keys, join.rhs.row_type())?;
                Ok(join.lhs.row_type().clone())
            }
            Self::TableScan(scan) => {
                for index_id in &scan.clustered_indexes {
                    get_index(&scan.schema, *index_id)?;
                }
                match &scan.projected_columns {
                    None => Ok(scan.schema.get_row_type().clone()),
                    Some(cols) => Ok(scan
                        .schema
                        .project(cols.iter())?
                        .into_iter()
                        .map(|col| ProductTypeElement::new(col.col_name.clone(), col.col_type.clone()))
                        .collect()),
                }
            }
            Self::IxSearch(search) => {
                search.scan.index()?;
                Ok(rid_row_type())
            }
            Self::IxMerge(_) => Ok(rid_row_type()),
            Self::IxIntersect(intersect) => {
                if intersect.inputs.len() < 2 {
                    return Err(PlanError::IntersectArity(intersect.inputs.len()));
                }
                Ok(rid_row_type())
            }
            Self::Project(project) => project
                .fields
                .iter()
                .map(|field| {
                    field.expr.check_fields(project.input.row_type())?;
                    Ok(ProductTypeElement::new(field.name.clone(), field.expr.ty().clone()))
                })
                .collect(),
            Self::Sort(sort) => {
                check_positions(&sort.keys, sort.input.row_type())?;
                Ok(sort.input.row_type().clone())
            }
            Self::Filter(filter) => {
                filter.predicate.check_fields(filter.input.row_type())?;
                Ok(filter.input.row_type().clone())
            }
        }
    }
}

/// Index operators return a single row id column
fn rid_row_type() -> ProductType {
    [ProductTypeElement::new("rid", AlgebraicType::U64)].into_iter().collect()
}

fn check_positions(cols: &ColList, row_type: &ProductType) -> PlanResult<()> {
    match cols.iter().find(|col| col.idx() >= row_type.len()) {
        Some(col) => Err(PlanError::FieldOutOfRange {
            pos: col.idx(),
            nfields: row_type.len(),
        }),
        None => Ok(()),
    }
}

fn get_index(schema: &TableSchema, index_id: IndexId) -> PlanResult<&IndexSchema> {
    schema.get_index(index_id).ok_or_else(|| PlanError::UnknownIndex {
        index_id,
        table: schema.table_name.clone(),
    })
}

/// A semijoin on equal keys.
///
/// Key `i` of the lhs is compared to key `i` of the rhs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemiJoin {
    /// The probe side
    pub lhs: PlanRef,
    /// The build side
    pub rhs: PlanRef,
    /// Field positions in the lhs row
    pub lhs_keys: ColList,
    /// Field positions in the rhs row
    pub rhs_keys: ColList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScan {
    pub schema: Arc<TableSchema>,
    /// The row id source, if any, followed by the inputs of a residual filter
    pub inputs: Vec<PlanRef>,
    pub clustered_indexes: Vec<IndexId>,
    pub connection: ConnectionId,
    /// The table columns this scan returns, in order.
    /// `None` means all of them.
    pub projected_columns: Option<ColList>,
    pub has_extra_filter: bool,
}

impl TableScan {
    /// Maps a field of this scan's output row to a table column
    pub fn table_column(&self, pos: usize) -> Option<ColId> {
        match &self.projected_columns {
            Some(cols) => cols.get(pos),
            None => (pos < self.schema.columns().len()).then_some(ColId::from(pos)),
        }
    }

    /// The index probe that supplies this scan's row ids
    pub fn probe(&self) -> Option<&PlanRef> {
        self.inputs.first().filter(|input| input.is_probe())
    }

    /// The inputs that are not a row id source
    pub fn residual_inputs(&self) -> &[PlanRef] {
        match self.probe() {
            Some(_) => &self.inputs[1..],
            None => &self.inputs,
        }
    }
}

/// An index on a table, as read by an [`IxSearch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IxScan {
    pub schema: Arc<TableSchema>,
    pub index_id: IndexId,
    pub connection: ConnectionId,
}

impl IxScan {
    pub fn index(&self) -> PlanResult<&IndexSchema> {
        get_index(&self.schema, self.index_id)
    }
}

/// An index search whose search keys are the rows of its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IxSearch {
    pub input: PlanRef,
    pub scan: IxScan,
    pub unique_key: bool,
    pub outer: bool,
    /// Set iff this search is part of an intersect group
    pub params: Option<SharedParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IxMerge {
    pub input: PlanRef,
    /// Set iff this merge is part of an intersect group
    pub params: Option<SharedParams>,
    /// Every merge has its own row id limit
    pub rid_limit: ParamId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IxIntersect {
    pub inputs: Vec<PlanRef>,
    pub params: SharedParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectField {
    pub name: Box<str>,
    pub expr: PhysicalExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub input: PlanRef,
    pub fields: Vec<ProjectField>,
}

/// Sorts its input ascending on `keys`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub input: PlanRef,
    pub keys: ColList,
    pub discard_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub input: PlanRef,
    pub predicate: PhysicalExpr,
}
