//! Builds the index probes that supply a table scan's row ids
use colstore_primitives::ColList;
use colstore_schema::types::{AlgebraicType, ProductType};

use crate::errors::{PlanError, PlanResult};
use crate::expr::{generate_casts, not_null_predicate, PhysicalExpr};
use crate::ix_select::KeyMatch;
use crate::params::{ParamAllocator, SharedParams};
use crate::plan::{
    Filter, IxIntersect, IxMerge, IxScan, IxSearch, PhysicalPlan, PlanNode, PlanRef, Project, ProjectField, SemiJoin, Sort,
};

/// Keeps the rows of `input` that have no null in any of `positions`.
///
/// Returns `input` itself if `positions` is empty.
pub fn null_filter(input: PlanRef, positions: &[usize]) -> PlanResult<PlanRef> {
    match not_null_predicate(input.row_type(), positions)? {
        None => Ok(input),
        Some(predicate) => PlanNode::new(Filter { input, predicate }),
    }
}

/// Builds the search keys for an index from the rhs of `join`.
///
/// `lhs_row` is the row type the lhs keys refer to.
/// The result has one column per matched index key, in index key order.
/// Its rows have no nulls, are sorted, and are distinct.
/// If any key type differs from the corresponding lhs type,
/// every key is cast to the lhs type.
pub fn search_keys(join: &SemiJoin, lhs_row: &ProductType, key_match: &KeyMatch) -> PlanResult<PlanRef> {
    let rhs_row = join.rhs.row_type();
    let nkeys = key_match.len();

    let mut rhs_positions = Vec::with_capacity(nkeys);
    let mut fields = Vec::with_capacity(nkeys);
    let mut lhs_types = Vec::with_capacity(nkeys);
    let mut lhs_names = Vec::with_capacity(nkeys);
    let mut cast_required = false;

    for &i in &key_match.permutation {
        let (Some(lhs_col), Some(rhs_col)) = (join.lhs_keys.get(i), join.rhs_keys.get(i)) else {
            return Err(PlanError::FieldOutOfRange {
                pos: i,
                nfields: join.lhs_keys.len().min(join.rhs_keys.len()),
            });
        };
        let lhs = lhs_row.get(lhs_col.idx()).ok_or(PlanError::FieldOutOfRange {
            pos: lhs_col.idx(),
            nfields: lhs_row.len(),
        })?;
        let expr = PhysicalExpr::field(rhs_row, rhs_col.idx())?;
        cast_required |= *expr.ty() != lhs.algebraic_type;

        rhs_positions.push(rhs_col.idx());
        lhs_types.push(lhs.algebraic_type.clone());
        lhs_names.push(lhs.name.clone());
        fields.push(ProjectField {
            name: rhs_row.field_name(rhs_col.idx()).unwrap_or_default().into(),
            expr,
        });
    }

    if cast_required {
        log::debug!(
            "Casting search keys {} to {}",
            types(&fields),
            lhs_types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
        let target = ProductType::from_parts(lhs_types, lhs_names);
        let exprs = generate_casts(&target, fields.iter().map(|field| field.expr.clone()).collect());
        for (field, expr) in fields.iter_mut().zip(exprs) {
            field.expr = expr;
        }
    }

    let input = null_filter(join.rhs.clone(), &rhs_positions)?;
    let input = PlanNode::new(Project { input, fields })?;
    PlanNode::new(Sort {
        input,
        keys: ColList::iota(nkeys),
        discard_duplicates: true,
    })
}

fn types(fields: &[ProjectField]) -> String {
    fields
        .iter()
        .map(|field| field.expr.ty())
        .map(AlgebraicType::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Searches `scan` with the rows of `keys` and merges the row ids it finds.
///
/// The merge gets a fresh row id limit.
pub fn merge_search(
    keys: PlanRef,
    scan: IxScan,
    params: Option<SharedParams>,
    alloc: &dyn ParamAllocator,
) -> PlanResult<PlanRef> {
    let search = PlanNode::new(IxSearch {
        input: keys,
        scan,
        unique_key: true,
        outer: false,
        params,
    })?;
    PlanNode::new(IxMerge {
        input: search,
        params,
        rid_limit: alloc.allocate(),
    })
}

/// Combines a new probe with the probe a scan already reads through.
///
/// An existing intersect is extended and its parameters are reused.
/// A lone merge has no parameters yet,
/// so a fresh pair is minted and its search is rebuilt to carry them.
///
/// Returns the row id source for the rebuilt scan.
pub fn add_probe(
    existing: Option<&PlanRef>,
    keys: PlanRef,
    scan: IxScan,
    alloc: &dyn ParamAllocator,
) -> PlanResult<PlanRef> {
    let table = scan.schema.table_name.clone();
    let Some(existing) = existing else {
        return merge_search(keys, scan, None, alloc);
    };
    match existing.plan() {
        PhysicalPlan::IxIntersect(intersect) => {
            let consistent = intersect.inputs.iter().all(|input| match input.plan() {
                PhysicalPlan::IxMerge(merge) => merge.params == Some(intersect.params),
                _ => false,
            });
            if !consistent {
                return Err(PlanError::malformed(
                    &table,
                    "intersect inputs must be merges sharing the intersect's parameters",
                ));
            }
            log::debug!(
                "Reusing parameters {:?} for probe {} of an intersect",
                intersect.params,
                intersect.inputs.len() + 1
            );
            let merge = merge_search(keys, scan, Some(intersect.params), alloc)?;
            PlanNode::new(IxIntersect {
                inputs: intersect.inputs.iter().cloned().chain([merge]).collect(),
                params: intersect.params,
            })
        }
        PhysicalPlan::IxMerge(merge) => {
            let PhysicalPlan::IxSearch(search) = merge.input.plan() else {
                return Err(PlanError::malformed(&table, "merge does not read an index search"));
            };
            if merge.params.is_some() || search.params.is_some() {
                return Err(PlanError::malformed(
                    &table,
                    "a merge outside an intersect carries shared parameters",
                ));
            }
            let params = SharedParams::allocate(alloc);
            log::debug!("Minted parameters {params:?} to intersect two probes");

            let new_merge = merge_search(keys, scan, Some(params), alloc)?;
            let old_search = PlanNode::new(IxSearch {
                params: Some(params),
                ..search.clone()
            })?;
            let old_merge = PlanNode::new(IxMerge {
                input: old_search,
                params: Some(params),
                rid_limit: alloc.allocate(),
            })?;
            PlanNode::new(IxIntersect {
                inputs: vec![old_merge, new_merge],
                params,
            })
        }
        _ => Err(PlanError::malformed(&table, "row id source is not a merge or an intersect")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use colstore_primitives::{ColId, ColList, ConnectionId, IndexId, ParamId};
    use colstore_schema::types::AlgebraicType;
    use pretty_assertions::assert_eq;

    use super::{add_probe, merge_search, null_filter, search_keys};
    use crate::errors::PlanError;
    use crate::expr::PhysicalExpr;
    use crate::ix_select::KeyMatch;
    use crate::params::SharedParams;
    use crate::plan::{IxIntersect, IxScan, PhysicalPlan, PlanNode, PlanRef, SemiJoin};
    use crate::testing::{allocator, scan, schema};

    fn join(lhs: &[(&str, AlgebraicType)], rhs: &[(&str, AlgebraicType)], keys: &[(usize, usize)]) -> SemiJoin {
        let l = schema(1, "l", lhs, &[]);
        let r = schema(2, "r", rhs, &[]);
        SemiJoin {
            lhs: scan(&l),
            rhs: scan(&r),
            lhs_keys: keys.iter().map(|(l, _)| ColId::from(*l)).collect(),
            rhs_keys: keys.iter().map(|(_, r)| ColId::from(*r)).collect(),
        }
    }

    fn key_match(permutation: &[usize]) -> KeyMatch {
        KeyMatch {
            permutation: permutation.to_vec(),
        }
    }

    /// Unpacks sort -> project -> filter -> rhs
    fn unpack(keys: &PlanRef) -> (&ColList, Vec<PhysicalExpr>, Vec<&str>, &PhysicalExpr) {
        match keys.plan() {
            PhysicalPlan::Sort(sort) => {
                assert!(sort.discard_duplicates);
                match sort.input.plan() {
                    PhysicalPlan::Project(project) => match project.input.plan() {
                        PhysicalPlan::Filter(filter) => (
                            &sort.keys,
                            project.fields.iter().map(|f| f.expr.clone()).collect(),
                            project.fields.iter().map(|f| &*f.name).collect(),
                            &filter.predicate,
                        ),
                        plan => panic!("unexpected plan: {:#?}", plan),
                    },
                    plan => panic!("unexpected plan: {:#?}", plan),
                }
            }
            plan => panic!("unexpected plan: {:#?}", plan),
        }
    }

    fn not_null(pos: usize, ty: AlgebraicType) -> PhysicalExpr {
        PhysicalExpr::IsNotNull(Box::new(PhysicalExpr::Field(pos, ty)))
    }

    #[test]
    fn keys_follow_index_order_without_cast() {
        let join = join(
            &[("a", AlgebraicType::I64), ("b", AlgebraicType::I32)],
            &[("x", AlgebraicType::I32), ("y", AlgebraicType::I64), ("z", AlgebraicType::Date)],
            &[(0, 1), (1, 0)],
        );
        // Index keys are (b, a)
        let keys = search_keys(&join, join.lhs.row_type(), &key_match(&[1, 0])).unwrap();
        let (sort_keys, exprs, names, predicate) = unpack(&keys);

        assert_eq!(sort_keys, &ColList::iota(2));
        assert_eq!(
            exprs,
            vec![
                PhysicalExpr::Field(0, AlgebraicType::I32),
                PhysicalExpr::Field(1, AlgebraicType::I64)
            ]
        );
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(
            predicate,
            &PhysicalExpr::And(vec![
                not_null(0, AlgebraicType::I32),
                not_null(1, AlgebraicType::I64)
            ])
        );
        assert_eq!(keys.row_type().to_string(), "(x: INTEGER, y: BIGINT)");
    }

    #[test]
    fn one_mismatch_casts_every_key() {
        let join = join(
            &[("a", AlgebraicType::I64), ("b", AlgebraicType::Varchar(10))],
            &[("x", AlgebraicType::I32), ("y", AlgebraicType::Varchar(10))],
            &[(0, 0), (1, 1)],
        );
        let keys = search_keys(&join, join.lhs.row_type(), &key_match(&[0, 1])).unwrap();
        let (_, exprs, names, predicate) = unpack(&keys);

        assert_eq!(
            exprs,
            vec![
                PhysicalExpr::Cast(
                    Box::new(PhysicalExpr::Field(0, AlgebraicType::I32)),
                    AlgebraicType::I64
                ),
                PhysicalExpr::Cast(
                    Box::new(PhysicalExpr::Field(1, AlgebraicType::Varchar(10))),
                    AlgebraicType::Varchar(10)
                ),
            ]
        );
        // The projection keeps the rhs names
        assert_eq!(names, vec!["x", "y"]);
        // Nulls are checked on the raw rhs values
        assert_eq!(
            predicate,
            &PhysicalExpr::And(vec![
                not_null(0, AlgebraicType::I32),
                not_null(1, AlgebraicType::Varchar(10))
            ])
        );
        assert_eq!(keys.row_type().to_string(), "(x: BIGINT, y: VARCHAR(10))");
    }

    #[test]
    fn single_key_filter() {
        let join = join(
            &[("a", AlgebraicType::I64), ("b", AlgebraicType::I64)],
            &[("x", AlgebraicType::I64), ("y", AlgebraicType::I64)],
            &[(0, 1), (1, 0)],
        );
        let keys = search_keys(&join, join.lhs.row_type(), &key_match(&[0])).unwrap();
        let (_, exprs, _, predicate) = unpack(&keys);
        assert_eq!(exprs, vec![PhysicalExpr::Field(1, AlgebraicType::I64)]);
        assert_eq!(predicate, &not_null(1, AlgebraicType::I64));
    }

    #[test]
    fn empty_null_filter_is_the_input() {
        let t = schema(1, "t", &[("a", AlgebraicType::I64)], &[]);
        let input = scan(&t);
        assert!(Arc::ptr_eq(&null_filter(input.clone(), &[]).unwrap(), &input));
        assert_eq!(
            null_filter(input, &[1]).unwrap_err(),
            PlanError::FieldOutOfRange { pos: 1, nfields: 1 }
        );
    }

    fn ix_scan(index_id: u32) -> IxScan {
        IxScan {
            schema: schema(1, "t", &[("a", AlgebraicType::I64), ("b", AlgebraicType::I64)], &[&[0], &[1]]),
            index_id: IndexId(index_id),
            connection: ConnectionId(0),
        }
    }

    fn keys() -> PlanRef {
        scan(&schema(2, "s", &[("x", AlgebraicType::I64)], &[]))
    }

    #[test]
    fn lone_probe_has_no_shared_params() {
        let alloc = allocator();
        let merge = add_probe(None, keys(), ix_scan(1), &alloc).unwrap();
        let PhysicalPlan::IxMerge(merge) = merge.plan() else {
            panic!("unexpected plan: {:#?}", merge);
        };
        assert_eq!(merge.params, None);
        assert_eq!(merge.rid_limit, ParamId(100));
        let PhysicalPlan::IxSearch(search) = merge.input.plan() else {
            panic!("unexpected plan: {:#?}", merge.input);
        };
        assert!(search.unique_key);
        assert!(!search.outer);
        assert_eq!(search.params, None);
        assert_eq!(search.scan.index_id, IndexId(1));
    }

    #[test]
    fn promoting_a_merge_rebuilds_its_search() {
        let alloc = allocator();
        let existing = add_probe(None, keys(), ix_scan(1), &alloc).unwrap();
        let intersect = add_probe(Some(&existing), keys(), ix_scan(2), &alloc).unwrap();

        let params = SharedParams {
            start_rid: ParamId(101),
            row_limit: ParamId(102),
        };
        let PhysicalPlan::IxIntersect(intersect) = intersect.plan() else {
            panic!("unexpected plan: {:#?}", intersect);
        };
        assert_eq!(intersect.params, params);

        let [old, new] = intersect.inputs.as_slice() else {
            panic!("unexpected inputs: {:#?}", intersect.inputs);
        };
        for (merge, index_id, rid_limit) in [(old, 1, 104), (new, 2, 103)] {
            let PhysicalPlan::IxMerge(merge) = merge.plan() else {
                panic!("unexpected plan: {:#?}", merge);
            };
            assert_eq!(merge.params, Some(params));
            assert_eq!(merge.rid_limit, ParamId(rid_limit));
            let PhysicalPlan::IxSearch(search) = merge.input.plan() else {
                panic!("unexpected plan: {:#?}", merge.input);
            };
            assert_eq!(search.params, Some(params));
            assert_eq!(search.scan.index_id, IndexId(index_id));
        }

        // The old search still reads the same keys, and the old nodes are untouched
        let PhysicalPlan::IxMerge(before) = existing.plan() else {
            panic!("unexpected plan: {:#?}", existing);
        };
        assert_eq!(before.params, None);
        let (PhysicalPlan::IxSearch(before), PhysicalPlan::IxMerge(after)) = (before.input.plan(), old.plan()) else {
            panic!("unexpected plans");
        };
        assert!(Arc::ptr_eq(&before.input, after.input.inputs()[0]));
    }

    #[test]
    fn inconsistent_probes_are_rejected() {
        let alloc = allocator();
        let params = SharedParams::allocate(&alloc);
        let shared = merge_search(keys(), ix_scan(1), Some(params), &alloc).unwrap();
        let err = add_probe(Some(&shared), keys(), ix_scan(2), &alloc).unwrap_err();
        assert!(matches!(err, PlanError::MalformedProbe { .. }), "{err:?}");

        let lone = merge_search(keys(), ix_scan(1), None, &alloc).unwrap();
        let other = merge_search(keys(), ix_scan(2), Some(params), &alloc).unwrap();
        let intersect = PlanNode::new(IxIntersect {
            inputs: vec![lone, other],
            params,
        })
        .unwrap();
        let err = add_probe(Some(&intersect), keys(), ix_scan(2), &alloc).unwrap_err();
        assert!(matches!(err, PlanError::MalformedProbe { .. }), "{err:?}");

        let err = add_probe(Some(&keys()), keys(), ix_scan(2), &alloc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed index probe under scan of `t`: row id source is not a merge or an intersect"
        );
    }
}
