use crate::ColId;
use core::fmt;
use itertools::Itertools;
use smallvec::SmallVec;

/// An ordered list of column ids.
///
/// Unlike a set, the order matters and duplicates are kept.
/// Index keys, sort keys and join keys are all lists in this sense.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColList(SmallVec<[ColId; 4]>);

impl ColList {
    /// An empty list.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// The list `[0, 1, .., n - 1]`.
    pub fn iota(n: usize) -> Self {
        (0..n).map(ColId::from).collect()
    }

    pub fn push(&mut self, col: ColId) {
        self.0.push(col);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the column at position `pos` in the list.
    pub fn get(&self, pos: usize) -> Option<ColId> {
        self.0.get(pos).copied()
    }

    /// Returns the column if this list has exactly one element.
    pub fn as_singleton(&self) -> Option<ColId> {
        match self.0.as_slice() {
            [col] => Some(*col),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = ColId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ColId> for ColList {
    fn from_iter<T: IntoIterator<Item = ColId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<C: Into<ColId> + Copy> From<&[C]> for ColList {
    fn from(cols: &[C]) -> Self {
        cols.iter().map(|col| (*col).into()).collect()
    }
}

impl From<ColId> for ColList {
    fn from(col: ColId) -> Self {
        let mut list = Self::new();
        list.push(col);
        list
    }
}

impl fmt::Display for ColList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}
