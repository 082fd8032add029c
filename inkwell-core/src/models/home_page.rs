use serde::Serialize;

/// Site-wide counters. There is exactly one row.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct HomePage {
    pub view_times: i64,
}
