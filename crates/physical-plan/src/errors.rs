use colstore_primitives::IndexId;
use colstore_schema::error::InvalidFieldError;
use thiserror::Error;

use crate::plan::PlanKind;

/// Errors raised while constructing or rewriting a physical plan.
///
/// None of these mean "the rule does not apply".
/// They mean the input violates a contract and no plan should be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Field {pos} is out of range for an input with {nfields} fields")]
    FieldOutOfRange { pos: usize, nfields: usize },
    #[error(transparent)]
    InvalidField(#[from] InvalidFieldError),
    #[error("Semijoin has {lhs} left keys but {rhs} right keys")]
    JoinKeyArity { lhs: usize, rhs: usize },
    #[error("Index {index_id} does not exist on `{table}`")]
    UnknownIndex { index_id: IndexId, table: Box<str> },
    #[error("An index intersection needs at least two inputs, found {0}")]
    IntersectArity(usize),
    #[error("{kind} takes {expected} inputs, found {found}")]
    InputArity { kind: PlanKind, expected: usize, found: usize },
    #[error("Malformed index probe under scan of `{table}`: {reason}")]
    MalformedProbe { table: Box<str>, reason: &'static str },
}

impl PlanError {
    pub(crate) fn malformed(table: &str, reason: &'static str) -> Self {
        Self::MalformedProbe {
            table: table.into(),
            reason,
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
