use colstore_primitives::ColId;
use thiserror::Error;

/// A column position that does not exist in a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Column {col_pos} does not exist in `{table}` which has {ncols} columns")]
pub struct InvalidFieldError {
    pub table: Box<str>,
    pub col_pos: ColId,
    pub ncols: usize,
}
