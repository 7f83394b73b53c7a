use crate::error::InvalidFieldError;
use crate::types::{AlgebraicType, ProductType, ProductTypeElement};
use colstore_primitives::{ColId, ColList, IndexId, TableId};

/// A struct representing the schema of a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub table_id: TableId,
    /// Position of the column within the table.
    pub col_pos: ColId,
    pub col_name: Box<str>,
    pub col_type: AlgebraicType,
}

/// A struct representing the schema of an index.
///
/// The key columns are in the index's physical key order.
/// A clustered index determines how rows are stored,
/// an unclustered one maps key values to row ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub index_id: IndexId,
    pub table_id: TableId,
    pub index_name: Box<str>,
    pub columns: ColList,
    pub clustered: bool,
}

impl IndexSchema {
    /// The key columns in physical key order.
    pub fn key_columns(&self) -> &ColList {
        &self.columns
    }
}

/// A data structure representing the schema of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_id: TableId,
    pub table_name: Box<str>,
    columns: Vec<ColumnSchema>,
    /// Indexes in catalog order.
    pub indexes: Vec<IndexSchema>,
    row_type: ProductType,
}

impl TableSchema {
    pub fn new(table_id: TableId, table_name: Box<str>, columns: Vec<ColumnSchema>, indexes: Vec<IndexSchema>) -> Self {
        let row_type = columns
            .iter()
            .map(|c| ProductTypeElement::new(c.col_name.clone(), c.col_type.clone()))
            .collect();

        Self {
            table_id,
            table_name,
            columns,
            indexes,
            row_type,
        }
    }

    /// IMPORTANT: Ban changes from outside so [Self::get_row_type] won't get invalidated.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Get a reference to a column by its position (`pos`) in the table.
    pub fn get_column(&self, pos: usize) -> Option<&ColumnSchema> {
        self.columns.get(pos)
    }

    /// Project the columns at the supplied positions, in that order.
    pub fn project(&self, cols: impl Iterator<Item = ColId>) -> Result<Vec<&ColumnSchema>, InvalidFieldError> {
        cols.map(|col| self.get_column(col.idx()).ok_or_else(|| self.invalid_field(col)))
            .collect()
    }

    pub fn get_row_type(&self) -> &ProductType {
        &self.row_type
    }

    pub fn get_index(&self, index_id: IndexId) -> Option<&IndexSchema> {
        self.indexes.iter().find(|ix| ix.index_id == index_id)
    }

    /// The secondary indexes of this table, in catalog order.
    pub fn unclustered_indexes(&self) -> impl Iterator<Item = &IndexSchema> + '_ {
        self.indexes.iter().filter(|ix| !ix.clustered)
    }

    pub fn clustered_indexes(&self) -> impl Iterator<Item = &IndexSchema> + '_ {
        self.indexes.iter().filter(|ix| ix.clustered)
    }

    /// Checks that every key column of `index` is a column of this table.
    pub fn validate_index(&self, index: &IndexSchema) -> Result<(), InvalidFieldError> {
        match index.columns.iter().find(|col| self.get_column(col.idx()).is_none()) {
            Some(col) => Err(self.invalid_field(col)),
            None => Ok(()),
        }
    }

    fn invalid_field(&self, col_pos: ColId) -> InvalidFieldError {
        InvalidFieldError {
            table: self.table_name.clone(),
            col_pos,
            ncols: self.columns.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> TableSchema {
        let table_id = TableId(1);
        let columns = [("a", AlgebraicType::I64), ("b", AlgebraicType::Varchar(8))]
            .into_iter()
            .enumerate()
            .map(|(i, (name, ty))| ColumnSchema {
                table_id,
                col_pos: i.into(),
                col_name: name.into(),
                col_type: ty,
            })
            .collect();
        let index = |id: u32, cols: &[usize], clustered| IndexSchema {
            index_id: IndexId(id),
            table_id,
            index_name: format!("ix_{id}").into(),
            columns: ColList::from(cols),
            clustered,
        };
        TableSchema::new(
            table_id,
            "t".into(),
            columns,
            vec![index(0, &[0, 1], true), index(1, &[1], false), index(2, &[0], false)],
        )
    }

    #[test]
    fn unclustered_indexes_keep_catalog_order() {
        let t = table();
        let ids = t.unclustered_indexes().map(|ix| ix.index_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![IndexId(1), IndexId(2)]);
        let ids = t.clustered_indexes().map(|ix| ix.index_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![IndexId(0)]);
    }

    #[test]
    fn row_type_follows_columns() {
        let t = table();
        assert_eq!(t.get_row_type().to_string(), "(a: BIGINT, b: VARCHAR(8))");
    }

    #[test]
    fn project_rejects_missing_columns() {
        let t = table();
        let cols = t.project([ColId(1), ColId(0)].into_iter()).unwrap();
        assert_eq!(cols.iter().map(|c| &*c.col_name).collect::<Vec<_>>(), vec!["b", "a"]);

        let err = t.project([ColId(5)].into_iter()).unwrap_err();
        assert_eq!(err.col_pos, ColId(5));
        assert_eq!(err.to_string(), "Column 5 does not exist in `t` which has 2 columns");
    }

    #[test]
    fn validate_index_checks_key_columns() {
        let mut t = table();
        assert!(t.indexes.iter().all(|ix| t.validate_index(ix).is_ok()));

        let bad = IndexSchema {
            columns: ColList::from(&[0usize, 9][..]),
            ..t.indexes[0].clone()
        };
        t.indexes.push(bad.clone());
        assert_eq!(t.validate_index(&bad).unwrap_err().col_pos, ColId(9));
    }
}
