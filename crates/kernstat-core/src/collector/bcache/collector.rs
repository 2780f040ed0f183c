//! bcache statistics collector.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::collector::traits::FileSystem;
use crate::parse::{ParseError, SkippedUnit, parse_u64};

use super::parser::{self, PriorityStats, WritebackRateDebug};

/// Hit/miss counters of one accounting period (`stats_*` directories).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    pub bypassed: u64,
    pub cache_bypass_hits: u64,
    pub cache_bypass_misses: u64,
    pub cache_hits: u64,
    pub cache_miss_collisions: u64,
    pub cache_misses: u64,
    pub cache_readaheads: u64,
}

/// The four accounting periods bcache keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Periods {
    pub five_minute: PeriodStats,
    pub hour: PeriodStats,
    pub day: PeriodStats,
    pub total: PeriodStats,
}

/// Counters from the `internal/` directory of a cache set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InternalStats {
    pub active_journal_entries: u64,
    pub btree_nodes: u64,
    pub btree_read_average_duration_us: u64,
    pub cache_read_races: u64,
}

/// Attributes of the cache set itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheSetStats {
    pub average_key_size: u64,
    pub btree_cache_size: u64,
    pub cache_available_percent: u64,
    pub congested: u64,
    pub root_usage_percent: u64,
    pub tree_depth: u64,
    pub internal: InternalStats,
    pub periods: Periods,
}

/// A backing device (`bdevN`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BdevStats {
    pub name: String,
    pub dirty_data: u64,
    pub periods: Periods,
    /// Absent when the device is not in writeback mode.
    pub writeback_rate_debug: Option<WritebackRateDebug>,
}

/// A cache device (`cacheN`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub io_errors: u64,
    pub metadata_written: u64,
    pub written: u64,
    pub priority: Option<PriorityStats>,
}

/// Everything known about one cache set, keyed by its UUID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BcacheStats {
    pub uuid: String,
    pub cache_set: CacheSetStats,
    pub bdevs: Vec<BdevStats>,
    pub caches: Vec<CacheStats>,
}

/// Result of one collection pass over `/sys/fs/bcache`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BcacheReport {
    pub sets: Vec<BcacheStats>,
    /// Cache sets that could not be read.
    pub skipped: Vec<SkippedUnit>,
}

/// Collector for bcache sysfs statistics.
pub struct BcacheCollector<F: FileSystem> {
    fs: F,
    bcache_path: PathBuf,
}

impl<F: FileSystem> BcacheCollector<F> {
    /// Creates a new BcacheCollector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation
    /// * `bcache_path` - Path to the bcache class directory (e.g., "/sys/fs/bcache")
    pub fn new(fs: F, bcache_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            bcache_path: bcache_path.into(),
        }
    }

    /// Collects statistics for every registered cache set.
    ///
    /// Entries without a `-` in their name (`register`, `pendings_cleanup`)
    /// are control files, not cache sets. A set that fails to parse is
    /// logged and reported in `skipped`; the others are still returned.
    pub fn collect(&self) -> Result<BcacheReport, ParseError> {
        let mut uuids = self.fs.read_dir(&self.bcache_path)?;
        uuids.sort();

        let mut report = BcacheReport::default();
        for path in uuids {
            let Some(uuid) = file_name(&path).filter(|n| n.contains('-')) else {
                continue;
            };
            match self.collect_set(&path, uuid) {
                Ok(stats) => report.sets.push(stats),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping bcache set");
                    report.skipped.push(SkippedUnit::new(&path, &e));
                }
            }
        }
        Ok(report)
    }

    /// Collects statistics for the cache set at `path`.
    pub fn collect_set(&self, path: &Path, uuid: &str) -> Result<BcacheStats, ParseError> {
        let internal = path.join("internal");
        let cache_set = CacheSetStats {
            average_key_size: self.read_value(&path.join("average_key_size"))?,
            btree_cache_size: self.read_value(&path.join("btree_cache_size"))?,
            cache_available_percent: self.read_value(&path.join("cache_available_percent"))?,
            congested: self.read_value(&path.join("congested"))?,
            root_usage_percent: self.read_value(&path.join("root_usage_percent"))?,
            tree_depth: self.read_value(&path.join("tree_depth"))?,
            internal: InternalStats {
                active_journal_entries: self.read_count(&internal.join("active_journal_entries"))?,
                btree_nodes: self.read_count(&internal.join("btree_nodes"))?,
                btree_read_average_duration_us: self
                    .read_count(&internal.join("btree_read_average_duration_us"))?,
                cache_read_races: self.read_count(&internal.join("cache_read_races"))?,
            },
            periods: self.read_periods(path)?,
        };

        let mut entries = self.fs.read_dir(path)?;
        entries.sort();

        let mut bdevs = Vec::new();
        let mut caches = Vec::new();
        for entry in entries {
            let Some(name) = file_name(&entry) else {
                continue;
            };
            if is_indexed(name, "bdev") {
                bdevs.push(self.collect_bdev(&entry, name)?);
            } else if is_indexed(name, "cache") {
                caches.push(self.collect_cache(&entry, name)?);
            }
        }

        debug!(
            uuid,
            bdevs = bdevs.len(),
            caches = caches.len(),
            "collected bcache set"
        );

        Ok(BcacheStats {
            uuid: uuid.to_string(),
            cache_set,
            bdevs,
            caches,
        })
    }

    fn collect_bdev(&self, path: &Path, name: &str) -> Result<BdevStats, ParseError> {
        let debug_path = path.join("writeback_rate_debug");
        let writeback_rate_debug = if self.fs.exists(&debug_path) {
            let content = self.fs.read_to_string(&debug_path)?;
            Some(parser::parse_writeback_rate_debug(content.as_bytes())?)
        } else {
            None
        };

        Ok(BdevStats {
            name: name.to_string(),
            dirty_data: self.read_value(&path.join("dirty_data"))?,
            periods: self.read_periods(path)?,
            writeback_rate_debug,
        })
    }

    fn collect_cache(&self, path: &Path, name: &str) -> Result<CacheStats, ParseError> {
        let priority_path = path.join("priority_stats");
        let priority = if self.fs.exists(&priority_path) {
            let content = self.fs.read_to_string(&priority_path)?;
            Some(parser::parse_priority_stats(content.as_bytes())?)
        } else {
            None
        };

        Ok(CacheStats {
            name: name.to_string(),
            io_errors: self.read_value(&path.join("io_errors"))?,
            metadata_written: self.read_value(&path.join("metadata_written"))?,
            written: self.read_value(&path.join("written"))?,
            priority,
        })
    }

    fn read_periods(&self, path: &Path) -> Result<Periods, ParseError> {
        Ok(Periods {
            five_minute: self.read_period(&path.join("stats_five_minute"))?,
            hour: self.read_period(&path.join("stats_hour"))?,
            day: self.read_period(&path.join("stats_day"))?,
            total: self.read_period(&path.join("stats_total"))?,
        })
    }

    fn read_period(&self, dir: &Path) -> Result<PeriodStats, ParseError> {
        Ok(PeriodStats {
            bypassed: self.read_value(&dir.join("bypassed"))?,
            cache_bypass_hits: self.read_value(&dir.join("cache_bypass_hits"))?,
            cache_bypass_misses: self.read_value(&dir.join("cache_bypass_misses"))?,
            cache_hits: self.read_value(&dir.join("cache_hits"))?,
            cache_miss_collisions: self.read_value(&dir.join("cache_miss_collisions"))?,
            cache_misses: self.read_value(&dir.join("cache_misses"))?,
            cache_readaheads: self.read_value(&dir.join("cache_readaheads"))?,
        })
    }

    /// Reads a humanized single-value attribute.
    fn read_value(&self, path: &Path) -> Result<u64, ParseError> {
        let content = self.fs.read_to_string(path)?;
        Ok(parser::parse_value(&content)?)
    }

    /// Reads a plain integer attribute.
    fn read_count(&self, path: &Path) -> Result<u64, ParseError> {
        let content = self.fs.read_to_string(path)?;
        Ok(parse_u64(content.trim())?)
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// `bdev0`, `cache12`; but not `cache_available_percent`.
fn is_indexed(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const ROOT: &str = "/sys/fs/bcache";
    const UUID: &str = "deaddd54-c735-46d5-868e-f331c5fd7c74";

    #[test]
    fn test_collect_bcache_system() {
        let collector = BcacheCollector::new(MockFs::bcache_system(), ROOT);
        let report = collector.collect().unwrap();

        assert!(report.skipped.is_empty());
        assert_eq!(report.sets.len(), 1);
        let set = &report.sets[0];
        assert_eq!(set.uuid, UUID);

        assert_eq!(set.cache_set.average_key_size, 0);
        assert_eq!(set.cache_set.btree_cache_size, 0);
        assert_eq!(set.cache_set.cache_available_percent, 100);
        assert_eq!(set.cache_set.root_usage_percent, 0);
        assert_eq!(set.cache_set.tree_depth, 0);
        assert_eq!(set.cache_set.internal.active_journal_entries, 1);
        assert_eq!(set.cache_set.internal.btree_nodes, 2);
        assert_eq!(set.cache_set.internal.btree_read_average_duration_us, 1305);
        assert_eq!(set.cache_set.periods.total.cache_hits, 546);
        assert_eq!(set.cache_set.periods.total.bypassed, 555008);

        assert_eq!(set.bdevs.len(), 1);
        let bdev = &set.bdevs[0];
        assert_eq!(bdev.name, "bdev0");
        assert_eq!(bdev.dirty_data, 0);
        assert_eq!(bdev.periods.five_minute.cache_hits, 0);
        assert_eq!(bdev.periods.total.cache_misses, 1);
        let debug = bdev.writeback_rate_debug.as_ref().unwrap();
        assert_eq!(debug.rate, 1150976);
        assert_eq!(debug.proportional, -437748);

        assert_eq!(set.caches.len(), 1);
        let cache = &set.caches[0];
        assert_eq!(cache.name, "cache0");
        assert_eq!(cache.io_errors, 0);
        assert_eq!(cache.metadata_written, 524288);
        assert_eq!(cache.written, 0);
        assert_eq!(
            cache.priority,
            Some(PriorityStats {
                unused_percent: 99,
                metadata_percent: 0,
            })
        );
    }

    #[test]
    fn test_collect_skips_broken_set() {
        let mut fs = MockFs::bcache_system();
        let broken = "0f1e2d3c-0000-4000-8000-000000000000";
        fs.add_file(format!("{ROOT}/{broken}/average_key_size"), "12q\n");

        let report = BcacheCollector::new(fs, ROOT).collect().unwrap();
        assert_eq!(report.sets.len(), 1);
        assert_eq!(report.sets[0].uuid, UUID);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with(broken));
        assert!(report.skipped[0].reason.contains("12q"));
    }

    #[test]
    fn test_optional_files_absent() {
        let mut fs = MockFs::new();
        let set = format!("{ROOT}/{UUID}");
        for file in [
            "average_key_size",
            "btree_cache_size",
            "cache_available_percent",
            "congested",
            "root_usage_percent",
            "tree_depth",
            "internal/active_journal_entries",
            "internal/btree_nodes",
            "internal/btree_read_average_duration_us",
            "internal/cache_read_races",
        ] {
            fs.add_file(format!("{set}/{file}"), "0\n");
        }
        for dir in ["", "/bdev0", "/cache0"] {
            for period in ["stats_five_minute", "stats_hour", "stats_day", "stats_total"] {
                for counter in [
                    "bypassed",
                    "cache_bypass_hits",
                    "cache_bypass_misses",
                    "cache_hits",
                    "cache_miss_collisions",
                    "cache_misses",
                    "cache_readaheads",
                ] {
                    fs.add_file(format!("{set}{dir}/{period}/{counter}"), "0\n");
                }
            }
        }
        fs.add_file(format!("{set}/bdev0/dirty_data"), "0\n");
        for file in ["io_errors", "metadata_written", "written"] {
            fs.add_file(format!("{set}/cache0/{file}"), "0\n");
        }
        fs.add_file(format!("{ROOT}/register"), "");

        let report = BcacheCollector::new(fs, ROOT).collect().unwrap();
        assert_eq!(report.sets.len(), 1);
        assert_eq!(report.sets[0].bdevs[0].writeback_rate_debug, None);
        assert_eq!(report.sets[0].caches[0].priority, None);
    }

    #[test]
    fn test_missing_bcache_root() {
        let collector = BcacheCollector::new(MockFs::new(), ROOT);
        assert!(matches!(collector.collect(), Err(ParseError::Stream(_))));
    }

    #[test]
    fn test_is_indexed() {
        assert!(is_indexed("bdev0", "bdev"));
        assert!(is_indexed("cache12", "cache"));
        assert!(!is_indexed("cache", "cache"));
        assert!(!is_indexed("cache_available_percent", "cache"));
    }
}
