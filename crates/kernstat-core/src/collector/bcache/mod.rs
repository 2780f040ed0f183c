//! bcache statistics from `/sys/fs/bcache`.
//!
//! Each registered cache set is a directory named by its UUID, holding
//! set-wide attributes plus `bdevN` (backing device) and `cacheN` (cache
//! device) subdirectories.

mod collector;
mod parser;

pub use collector::{
    BcacheCollector, BcacheReport, BcacheStats, BdevStats, CacheSetStats, CacheStats,
    InternalStats, PeriodStats, Periods,
};
pub use parser::{
    PriorityStats, WritebackRateDebug, parse_priority_stats, parse_value,
    parse_writeback_rate_debug,
};
