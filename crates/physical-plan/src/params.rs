use std::sync::atomic::{AtomicU32, Ordering};

use colstore_primitives::ParamId;

/// Issues correlation parameter ids.
///
/// Implementations must never hand out the same id twice.
pub trait ParamAllocator: Send + Sync {
    fn allocate(&self) -> ParamId;
}

/// A monotonic, thread safe [`ParamAllocator`]
#[derive(Debug, Default)]
pub struct AtomicParamAllocator {
    next: AtomicU32,
}

impl AtomicParamAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator whose first id is `first`
    pub fn starting_at(first: ParamId) -> Self {
        Self {
            next: AtomicU32::new(first.0),
        }
    }
}

impl ParamAllocator for AtomicParamAllocator {
    fn allocate(&self) -> ParamId {
        ParamId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// The parameters shared by every probe of an intersect group.
///
/// Probes carrying the same pair see the same row id cursor and row limit at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedParams {
    /// The row id the next search should start from
    pub start_rid: ParamId,
    /// The number of rows the next search may return
    pub row_limit: ParamId,
}

impl SharedParams {
    /// Mints a fresh pair, `start_rid` first
    pub fn allocate(params: &dyn ParamAllocator) -> Self {
        let start_rid = params.allocate();
        let row_limit = params.allocate();
        Self { start_rid, row_limit }
    }
}
