//! Parsers for individual bcache sysfs files.
//!
//! Most bcache attributes hold a single value printed by `bch_hprint()`.
//! Two files are multi-line: `writeback_rate_debug` (controller state of a
//! backing device) and `priority_stats` (bucket usage of a cache device).

use std::io::BufRead;
use std::sync::LazyLock;

use serde::Serialize;

use crate::parse::{DecodeError, FieldSet, MatchResult, ParseError, PatternSet, dehumanize};

static WRITEBACK_RATE_DEBUG: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        "rate: {rate:size}/sec",
        "dirty: {dirty:size}",
        "target: {target:size}",
        "proportional: {proportional:signed}",
        "integral: {integral:signed}",
        "change: {change:signed}/sec",
        "next io: {next_io:signed}ms",
    ])
});

static PRIORITY_STATS: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&["Unused: {unused}%", "Metadata: {metadata}%"]));

/// Writeback controller state of a backing device.
///
/// The controller terms can go negative once the dirty data drops below
/// target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WritebackRateDebug {
    /// Bytes per second.
    pub rate: u64,
    pub dirty: u64,
    pub target: u64,
    pub proportional: i64,
    pub integral: i64,
    /// Bytes per second.
    pub change: i64,
    /// Milliseconds until the next writeback I/O.
    pub next_io: i64,
}

/// Bucket usage of a cache device, in percent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityStats {
    pub unused_percent: u64,
    pub metadata_percent: u64,
}

/// Decodes a single-value attribute file.
pub fn parse_value(content: &str) -> Result<u64, DecodeError> {
    dehumanize(content.trim())
}

fn collect_fields(
    patterns: &PatternSet,
    what: &str,
    reader: impl BufRead,
) -> Result<FieldSet, ParseError> {
    let mut fields = FieldSet::new();
    for line in reader.lines() {
        let line = line?;
        if let MatchResult::Matched { captures, .. } = patterns.dispatch(&line) {
            captures.decode_into(&mut fields)?;
        }
    }
    if fields.is_empty() {
        return Err(ParseError::structural(what, "no recognised line"));
    }
    Ok(fields)
}

/// Parses `writeback_rate_debug`. Terms missing from older kernels read
/// as zero.
pub fn parse_writeback_rate_debug(reader: impl BufRead) -> Result<WritebackRateDebug, ParseError> {
    let fields = collect_fields(&WRITEBACK_RATE_DEBUG, "writeback_rate_debug", reader)?;
    let signed = |name: &str| fields.get_signed(name).unwrap_or(0);
    Ok(WritebackRateDebug {
        rate: fields.get_or_zero("rate"),
        dirty: fields.get_or_zero("dirty"),
        target: fields.get_or_zero("target"),
        proportional: signed("proportional"),
        integral: signed("integral"),
        change: signed("change"),
        next_io: signed("next_io"),
    })
}

/// Parses `priority_stats`. Only the two percentage lines are kept; the
/// quantile lines are ignored.
pub fn parse_priority_stats(reader: impl BufRead) -> Result<PriorityStats, ParseError> {
    let fields = collect_fields(&PRIORITY_STATS, "priority_stats", reader)?;
    Ok(PriorityStats {
        unused_percent: fields.get_or_zero("unused"),
        metadata_percent: fields.get_or_zero("metadata"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("1.1M\n").unwrap(), 1150976);
        assert_eq!(parse_value("100\n").unwrap(), 100);
        assert_eq!(parse_value("0").unwrap(), 0);
        assert_eq!(parse_value("\n").unwrap_err().token, "");
    }

    #[test]
    fn test_parse_writeback_rate_debug() {
        let input = "\
rate:\t\t1.1M/sec
dirty:\t\t20.4G
target:\t\t20.4G
proportional:\t427.5k
integral:\t790.0k
change:\t\t321.5k/sec
next io:\t17ms
";
        let debug = parse_writeback_rate_debug(input.as_bytes()).unwrap();
        assert_eq!(
            debug,
            WritebackRateDebug {
                rate: 1150976,
                dirty: 21894266880,
                target: 21894266880,
                proportional: 437748,
                integral: 808960,
                change: 329204,
                next_io: 17,
            }
        );
    }

    #[test]
    fn test_parse_writeback_rate_debug_negative_terms() {
        let input = "\
rate:\t\t4.0k/sec
dirty:\t\t0.0k
target:\t\t20.4G
proportional:\t-427.5k
integral:\t-790.0k
change:\t\t-321.5k/sec
next io:\t-1ms
";
        let debug = parse_writeback_rate_debug(input.as_bytes()).unwrap();
        assert_eq!(debug.rate, 4096);
        assert_eq!(debug.dirty, 0);
        assert_eq!(debug.proportional, -437748);
        assert_eq!(debug.integral, -808960);
        assert_eq!(debug.change, -329204);
        assert_eq!(debug.next_io, -1);
    }

    #[test]
    fn test_parse_writeback_rate_debug_bad_value() {
        let input = "rate:\t\t1.1Q/sec\n";
        let err = parse_writeback_rate_debug(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Decode(_)));
    }

    #[test]
    fn test_parse_priority_stats() {
        let input = "\
Unused:\t\t99%
Clean:\t\t0%
Dirty:\t\t0%
Metadata:\t0%
Average:\t10473
Sectors per Q:\t36288
Quantiles:\t[0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0]
";
        let stats = parse_priority_stats(input.as_bytes()).unwrap();
        assert_eq!(
            stats,
            PriorityStats {
                unused_percent: 99,
                metadata_percent: 0,
            }
        );
    }

    #[test]
    fn test_parse_priority_stats_unrecognised() {
        let err = parse_priority_stats("Average:\t10473\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Structural { .. }));
    }
}
