//! SELinux access vector cache (AVC) statistics from `selinuxfs`.
//!
//! `avc/cache_stats` is a table: one header row naming the columns, then
//! one row per CPU. The per-CPU rows are summed column by column.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::LazyLock;

use serde::Serialize;
use tracing::debug;

use crate::collector::traits::FileSystem;
use crate::parse::{FieldSet, MatchResult, ParseError, PatternSet, Value, parse_u64, parse_u64s};

static HASH_STATS: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        "entries: {entries}",
        "buckets used: {buckets_used}/{buckets_available}",
        "longest chain: {longest_chain}",
    ])
});

/// AVC lookup counters summed over all CPUs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvcCacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub allocations: u64,
    pub reclaims: u64,
    pub frees: u64,
}

/// AVC hash table occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvcHashStats {
    pub entries: u64,
    pub buckets_used: u64,
    pub buckets_available: u64,
    pub longest_chain: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvcStats {
    pub cache: AvcCacheStats,
    pub hash: AvcHashStats,
    pub cache_threshold: u64,
}

/// Parses `avc/cache_stats`.
///
/// Fails if the header row is missing or a CPU row has a different number
/// of columns than the header.
pub fn parse_cache_stats(reader: impl BufRead) -> Result<AvcCacheStats, ParseError> {
    let mut header: Option<Vec<String>> = None;
    let mut totals: Vec<u64> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let columns = match &header {
            Some(columns) => columns,
            None => {
                if tokens[0].bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseError::structural("cache_stats header", line.as_str()));
                }
                totals = vec![0; tokens.len()];
                header = Some(tokens.iter().map(|t| t.to_string()).collect());
                continue;
            }
        };

        if tokens.len() != columns.len() {
            return Err(ParseError::structural(
                format!("cache_stats row (expected {} columns)", columns.len()),
                line.as_str(),
            ));
        }
        for (total, value) in totals.iter_mut().zip(parse_u64s(&tokens)?) {
            *total = total.saturating_add(value);
        }
    }

    let Some(columns) = header else {
        return Err(ParseError::structural("cache_stats header", ""));
    };

    let sums: FieldSet = columns
        .iter()
        .zip(&totals)
        .map(|(name, total)| (name.as_str(), Value::from(*total)))
        .collect();
    for (name, _) in sums.iter() {
        if !AVC_COLUMNS.contains(&name) {
            debug!(column = name, "unknown cache_stats column ignored");
        }
    }

    Ok(AvcCacheStats {
        lookups: sums.get_or_zero("lookups"),
        hits: sums.get_or_zero("hits"),
        misses: sums.get_or_zero("misses"),
        allocations: sums.get_or_zero("allocations"),
        reclaims: sums.get_or_zero("reclaims"),
        frees: sums.get_or_zero("frees"),
    })
}

const AVC_COLUMNS: [&str; 6] = ["lookups", "hits", "misses", "allocations", "reclaims", "frees"];

/// Parses `avc/hash_stats`.
pub fn parse_hash_stats(reader: impl BufRead) -> Result<AvcHashStats, ParseError> {
    let mut fields = FieldSet::new();
    for line in reader.lines() {
        let line = line?;
        match HASH_STATS.dispatch(&line) {
            MatchResult::Matched { captures, .. } => captures.decode_into(&mut fields)?,
            MatchResult::NoMatch => debug!(line = %line, "unrecognised hash_stats line"),
        }
    }
    if fields.is_empty() {
        return Err(ParseError::structural("hash_stats", "no recognised line"));
    }

    Ok(AvcHashStats {
        entries: fields.get_or_zero("entries"),
        buckets_used: fields.get_or_zero("buckets_used"),
        buckets_available: fields.get_or_zero("buckets_available"),
        longest_chain: fields.get_or_zero("longest_chain"),
    })
}

/// Collector for the AVC files under `selinuxfs`.
pub struct SelinuxCollector<F: FileSystem> {
    fs: F,
    avc_path: PathBuf,
}

impl<F: FileSystem> SelinuxCollector<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation
    /// * `avc_path` - Path to the AVC directory (e.g., "/sys/fs/selinux/avc")
    pub fn new(fs: F, avc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            avc_path: avc_path.into(),
        }
    }

    pub fn collect(&self) -> Result<AvcStats, ParseError> {
        let cache = self.fs.read_to_string(&self.avc_path.join("cache_stats"))?;
        let hash = self.fs.read_to_string(&self.avc_path.join("hash_stats"))?;
        let threshold = self
            .fs
            .read_to_string(&self.avc_path.join("cache_threshold"))?;

        Ok(AvcStats {
            cache: parse_cache_stats(cache.as_bytes())?,
            hash: parse_hash_stats(hash.as_bytes())?,
            cache_threshold: parse_u64(threshold.trim())?,
        })
    }
}
