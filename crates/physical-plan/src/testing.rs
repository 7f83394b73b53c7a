//! Plan and schema builders shared by the unit tests
use std::sync::Arc;

use colstore_primitives::{ColList, ConnectionId, ParamId, TableId};
use colstore_schema::schema::{ColumnSchema, IndexSchema, TableSchema};
use colstore_schema::types::AlgebraicType;

use crate::params::AtomicParamAllocator;
use crate::plan::{PlanNode, PlanRef, SemiJoin, TableScan};

/// A table with a clustered index on its first column (id 0),
/// and one unclustered index per entry of `indexes` (ids 1, 2, ..), in that order.
///
/// Index `i` is named `{table_name}_ix{i}`.
pub(crate) fn schema(
    table_id: u32,
    table_name: &str,
    columns: &[(&str, AlgebraicType)],
    indexes: &[&[usize]],
) -> Arc<TableSchema> {
    let table_id = TableId(table_id);
    let index = |index_id: usize, index_name: String, cols: &[usize], clustered| IndexSchema {
        index_id: index_id.into(),
        table_id,
        index_name: index_name.into_boxed_str(),
        columns: ColList::from(cols),
        clustered,
    };
    let clustered = index(0, format!("{table_name}_cluster"), &[0], true);
    Arc::new(TableSchema::new(
        table_id,
        table_name.to_owned().into_boxed_str(),
        columns
            .iter()
            .enumerate()
            .map(|(i, (name, ty))| ColumnSchema {
                table_id,
                col_pos: i.into(),
                col_name: (*name).to_owned().into_boxed_str(),
                col_type: ty.clone(),
            })
            .collect(),
        std::iter::once(clustered)
            .chain(
                indexes
                    .iter()
                    .enumerate()
                    .map(|(i, cols)| index(i + 1, format!("{table_name}_ix{}", i + 1), *cols, false)),
            )
            .collect(),
    ))
}

/// A full scan of every column of `schema`
pub(crate) fn scan(schema: &Arc<TableSchema>) -> PlanRef {
    scan_with(schema, vec![], false)
}

/// A scan of every column of `schema` over the given inputs
pub(crate) fn scan_with(schema: &Arc<TableSchema>, inputs: Vec<PlanRef>, has_extra_filter: bool) -> PlanRef {
    PlanNode::new(TableScan {
        schema: schema.clone(),
        inputs,
        clustered_indexes: schema.clustered_indexes().map(|ix| ix.index_id).collect(),
        connection: ConnectionId(7),
        projected_columns: None,
        has_extra_filter,
    })
    .unwrap()
}

pub(crate) fn semijoin(lhs: PlanRef, rhs: PlanRef, lhs_keys: &[usize], rhs_keys: &[usize]) -> PlanRef {
    PlanNode::new(SemiJoin {
        lhs,
        rhs,
        lhs_keys: ColList::from(lhs_keys),
        rhs_keys: ColList::from(rhs_keys),
    })
    .unwrap()
}

/// An allocator whose ids are easy to tell apart from column positions
pub(crate) fn allocator() -> AtomicParamAllocator {
    AtomicParamAllocator::starting_at(ParamId(100))
}
