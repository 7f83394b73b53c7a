mod col_list;
mod ids;

pub use col_list::ColList;
pub use ids::{ColId, ConnectionId, IndexId, ParamId, TableId};
