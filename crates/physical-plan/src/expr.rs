use colstore_schema::types::{AlgebraicType, ProductType};

use crate::errors::{PlanError, PlanResult};

/// A physical scalar expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalExpr {
    /// A reference to a field of the input row, with the field's type
    Field(usize, AlgebraicType),
    /// Convert a value to another type
    Cast(Box<PhysicalExpr>, AlgebraicType),
    /// True iff the value is not null
    IsNotNull(Box<PhysicalExpr>),
    /// An n-ary conjunction
    And(Vec<PhysicalExpr>),
}

impl PhysicalExpr {
    /// A reference to field `pos` of `row_type`
    pub fn field(row_type: &ProductType, pos: usize) -> PlanResult<Self> {
        row_type
            .field_type(pos)
            .map(|ty| Self::Field(pos, ty.clone()))
            .ok_or(PlanError::FieldOutOfRange {
                pos,
                nfields: row_type.len(),
            })
    }

    /// The type this expression evaluates to
    pub fn ty(&self) -> &AlgebraicType {
        match self {
            Self::Field(_, ty) | Self::Cast(_, ty) => ty,
            Self::IsNotNull(_) | Self::And(_) => &AlgebraicType::Bool,
        }
    }

    /// Walks the expression tree and calls `f` on every subexpression
    pub fn visit(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        match self {
            Self::Cast(expr, _) | Self::IsNotNull(expr) => {
                expr.visit(f);
            }
            Self::And(exprs) => {
                for expr in exprs {
                    expr.visit(f);
                }
            }
            Self::Field(..) => {}
        }
    }

    /// Checks that every field reference is valid for `row_type`
    pub(crate) fn check_fields(&self, row_type: &ProductType) -> PlanResult<()> {
        let mut result = Ok(());
        self.visit(&mut |expr| {
            if let Self::Field(pos, _) = expr {
                if *pos >= row_type.len() && result.is_ok() {
                    result = Err(PlanError::FieldOutOfRange {
                        pos: *pos,
                        nfields: row_type.len(),
                    });
                }
            }
        });
        result
    }
}

/// Builds the predicate that discards rows with a null in any of `positions`.
///
/// Returns `None` when there is nothing to check.
pub fn not_null_predicate(row_type: &ProductType, positions: &[usize]) -> PlanResult<Option<PhysicalExpr>> {
    let mut exprs = positions
        .iter()
        .map(|pos| PhysicalExpr::field(row_type, *pos).map(|expr| PhysicalExpr::IsNotNull(Box::new(expr))))
        .collect::<PlanResult<Vec<_>>>()?;
    Ok(match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(PhysicalExpr::And(exprs)),
    })
}

/// Casts each expression to the type of the corresponding field of `target`.
///
/// Every expression is wrapped, including those that already have the target type,
/// so that the result has exactly the types of `target`.
///
/// Panics if `target` and `exprs` differ in length.
pub fn generate_casts(target: &ProductType, exprs: Vec<PhysicalExpr>) -> Vec<PhysicalExpr> {
    assert_eq!(target.len(), exprs.len(), "a target type is required for every expression");
    exprs
        .into_iter()
        .zip(target.elements())
        .map(|(expr, elem)| PhysicalExpr::Cast(Box::new(expr), elem.algebraic_type.clone()))
        .collect()
}
