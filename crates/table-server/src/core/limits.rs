use super::types::RequestEcho;

pub const DEFAULT_START_ROW: i64 = 0;
pub const DEFAULT_ROW_LIMIT: i64 = 10;

/// Clamp paging bounds to non-negative values. There is no upper bound on the limit.
pub fn coerce_bounds(start_row: i64, row_limit: i64) -> RequestEcho {
    RequestEcho {
        start_row: start_row.max(0),
        row_limit: row_limit.max(0),
    }
}
