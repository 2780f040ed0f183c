//! CIFS client statistics from `/proc/fs/cifs/Stats`.
//!
//! The file starts with resource counters for the whole client, followed
//! by one block per mounted share:
//!
//! ```text
//! CIFS Session: 1
//! Share (unique mount targets): 2
//! ...
//! 1) \\server\share
//! SMBs: 9 Oplocks breaks: 0
//! Reads:  0 Bytes: 0
//! ```
//!
//! SMB1 sessions print paired counters on one line; SMB2/3 sessions print
//! one `<Command>: <n> sent <m> failed` line per command.

use std::io::BufRead;
use std::sync::LazyLock;

use serde::Serialize;

use crate::parse::{
    BlockFormat, Captures, FieldSet, MatchResult, ParseError, PatternSet, RejectedBlock, parse_u64,
    segment,
};

static HEADER: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        "CIFS Session: {sessions}",
        "Share (unique mount targets): {shares}",
        "SMB Request/Response Buffer: {smb_buffer} Pool size: {smb_pool_size}",
        "SMB Small Req/Resp Buffer: {smb_small_buffer} Pool size: {smb_small_pool_size}",
        "Operations (MIDs): {operations}",
        "{session_count} session {share_reconnects} share reconnects",
        "Total vfs operations: {total_operations} maximum at one time: {total_max_operations}",
        "Total Large {large_allocations} Small {small_allocations} Allocations",
        "Max requests in flight: {max_requests_in_flight}",
    ])
});

static SESSION_START: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::new(&["{session_id}) \\\\{server:text}\\{share:rest}"]));

const SMB1_SMBS: usize = 0;
const SMB2_SMBS: usize = 1;
const SENT_FAILED: usize = 10;
const SINGLE: usize = 11;

// Specific shapes first; the two generic shapes at the end catch per-command
// lines of newer dialects.
static SESSION_BODY: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&[
        "SMBs: {smbs} Oplocks breaks: {oplock_breaks}",
        "SMBs: {smbs}",
        "Reads: {reads} Bytes: {read_bytes}",
        "Writes: {writes} Bytes: {write_bytes}",
        "Locks: {locks} HardLinks: {hardlinks} Symlinks: {symlinks}",
        "Opens: {opens} Closes: {closes} Deletes: {deletes}",
        "Posix Opens: {posix_opens} Posix Mkdirs: {posix_mkdirs}",
        "Mkdirs: {mkdirs} Rmdirs: {rmdirs}",
        "Renames: {renames} T2 Renames {t2_renames}",
        "FindFirst: {findfirst} FNext {fnext} FClose {fclose}",
        "{op:text}: {sent} sent {failed} failed",
        "{op:text}: {count}",
    ])
});

/// Protocol family, recognised from the shape of the `SMBs:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmbDialect {
    Smb1,
    /// SMB2 and SMB3 share one layout.
    Smb2,
}

/// Counters of one mounted share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CifsSession {
    pub id: u64,
    pub server: String,
    pub share: String,
    pub dialect: Option<SmbDialect>,
    pub counters: FieldSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CifsStats {
    /// Client-wide resource counters.
    pub header: FieldSet,
    pub sessions: Vec<CifsSession>,
    /// Sessions dropped because a counter did not decode.
    pub rejected: Vec<RejectedBlock>,
}

struct CifsFormat;

impl BlockFormat for CifsFormat {
    type Block = CifsSession;

    fn header_patterns(&self) -> &PatternSet {
        &HEADER
    }

    fn start_patterns(&self) -> &PatternSet {
        &SESSION_START
    }

    fn open_block(&self, _: usize, captures: &Captures<'_>) -> Result<CifsSession, ParseError> {
        let id = parse_u64(captures.raw("session_id").unwrap_or_default())?;
        Ok(CifsSession {
            id,
            server: captures.text("server").unwrap_or_default().to_string(),
            share: captures.text("share").unwrap_or_default().to_string(),
            dialect: None,
            counters: FieldSet::new(),
        })
    }

    fn absorb(&self, session: &mut CifsSession, line: &str) -> Result<bool, ParseError> {
        let MatchResult::Matched { index, captures } = SESSION_BODY.dispatch(line) else {
            return Ok(false);
        };

        match index {
            SENT_FAILED | SINGLE => {
                let op = field_name(captures.text("op").unwrap_or_default());
                for (name, value) in captures.numeric()? {
                    let key = match name {
                        "count" => op.clone(),
                        suffix => format!("{op}_{suffix}"),
                    };
                    session.counters.insert(key, value);
                }
            }
            _ => {
                captures.decode_into(&mut session.counters)?;
                match index {
                    SMB1_SMBS => session.dialect = Some(SmbDialect::Smb1),
                    SMB2_SMBS => session.dialect = Some(SmbDialect::Smb2),
                    _ => {}
                }
            }
        }
        Ok(true)
    }
}

/// `OplockBreaks` becomes `oplockbreaks`; anything that is not
/// alphanumeric becomes `_`.
fn field_name(op: &str) -> String {
    op.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Parses the contents of `/proc/fs/cifs/Stats`.
pub fn parse_stats(reader: impl BufRead) -> Result<CifsStats, ParseError> {
    let parsed = segment(&CifsFormat, reader)?;
    Ok(CifsStats {
        header: parsed.header,
        sessions: parsed.blocks,
        rejected: parsed.rejected,
    })
}
