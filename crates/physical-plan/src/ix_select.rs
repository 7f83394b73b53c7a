//! Chooses the index that covers the longest prefix of a semijoin's keys
use colstore_primitives::{ColId, ColList};
use colstore_schema::schema::IndexSchema;

/// How an index's leading key columns line up with a list of join keys.
///
/// `permutation[p]` is the position of the join key that supplies index key `p`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMatch {
    pub permutation: Vec<usize>,
}

impl KeyMatch {
    /// The number of leading index keys matched
    pub fn len(&self) -> usize {
        self.permutation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutation.is_empty()
    }
}

/// Matches the key columns of an index, in key order, against `join_cols`.
///
/// Stops at the first index key that no join key refers to,
/// so only a leading prefix of the index is ever matched.
/// A join key supplies at most one index key.
pub fn match_index_keys(index_keys: &ColList, join_cols: &[ColId]) -> KeyMatch {
    let mut permutation = Vec::with_capacity(index_keys.len().min(join_cols.len()));
    for key in index_keys.iter() {
        let found = join_cols
            .iter()
            .enumerate()
            .find(|(i, col)| **col == key && !permutation.contains(i))
            .map(|(i, _)| i);
        match found {
            Some(i) => permutation.push(i),
            None => break,
        }
    }
    KeyMatch { permutation }
}

/// The index chosen for a semijoin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChoice<'a> {
    pub index: &'a IndexSchema,
    pub key_match: KeyMatch,
}

/// Picks the index whose leading keys match the most join columns.
///
/// Ties go to the index seen first.
/// With `early_exit`, the search stops at the first index that matches every join column.
/// Returns `None` if no index matches even one.
pub fn select_index<'a>(
    indexes: impl IntoIterator<Item = &'a IndexSchema>,
    join_cols: &[ColId],
    early_exit: bool,
) -> Option<IndexChoice<'a>> {
    let mut best: Option<IndexChoice<'a>> = None;
    for index in indexes {
        let key_match = match_index_keys(index.key_columns(), join_cols);
        log::trace!(
            "Index `{}` on {} matches {} of {} join keys",
            index.index_name,
            index.key_columns(),
            key_match.len(),
            join_cols.len()
        );
        if key_match.len() > best.as_ref().map_or(0, |best| best.key_match.len()) {
            let full = key_match.len() == join_cols.len();
            best = Some(IndexChoice { index, key_match });
            if full && early_exit {
                break;
            }
        }
    }
    best
}
