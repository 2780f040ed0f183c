//! Parsers for `/proc/net/rpc/nfs` (client) and `/proc/net/rpc/nfsd`
//! (server).
//!
//! Both files are a sequence of `<keyword> <values...>` lines. A known
//! keyword that fails to decode makes the whole file invalid. Unknown
//! keywords are skipped, since kernels add lines over time.

use std::io::BufRead;

use serde::Serialize;
use tracing::debug;

use crate::parse::{Layout, ParseError, Schema};

use super::schema::{
    ClientRpc, ClientV4Stats, FileHandles, InputOutput, Network, ReadAheadCache, ReplyCache,
    ServerRpc, ServerV4Stats, Threads, V2Stats, V3Stats, V4Ops,
};

const WDELEG_GETATTR: Schema = Schema {
    keyword: "wdeleg_getattr",
    layout: Layout::Fixed { width: 1 },
    fields: &["count"],
};

/// NFS client RPC statistics. Lines the kernel did not print are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientRpcStats {
    pub network: Option<Network>,
    pub client_rpc: Option<ClientRpc>,
    pub v2_stats: Option<V2Stats>,
    pub v3_stats: Option<V3Stats>,
    pub client_v4_stats: Option<ClientV4Stats>,
}

/// NFS server RPC statistics. Lines the kernel did not print are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerRpcStats {
    pub reply_cache: Option<ReplyCache>,
    pub file_handles: Option<FileHandles>,
    pub input_output: Option<InputOutput>,
    pub threads: Option<Threads>,
    pub read_ahead_cache: Option<ReadAheadCache>,
    pub network: Option<Network>,
    pub server_rpc: Option<ServerRpc>,
    pub v2_stats: Option<V2Stats>,
    pub v3_stats: Option<V3Stats>,
    pub server_v4_stats: Option<ServerV4Stats>,
    pub v4_ops: Option<V4Ops>,
    /// Write delegations recalled because of a GETATTR.
    pub wdeleg_getattr: Option<u64>,
}

/// Walks `reader` line by line, handing `(keyword, values)` to `apply`,
/// which returns `Ok(false)` for keywords it does not know.
fn for_each_line<R, A>(reader: R, what: &str, mut apply: A) -> Result<(), ParseError>
where
    R: BufRead,
    A: FnMut(&str, &[&str]) -> Result<bool, ParseError>,
{
    let mut recognised = 0usize;
    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let values: Vec<&str> = tokens.collect();
        if apply(keyword, &values)? {
            recognised += 1;
        } else {
            debug!(keyword, "skipping unknown {} line", what);
        }
    }
    if recognised == 0 {
        return Err(ParseError::structural(what, "no recognised line"));
    }
    Ok(())
}

/// Parses the contents of `/proc/net/rpc/nfs`.
pub fn parse_client_rpc_stats(reader: impl BufRead) -> Result<ClientRpcStats, ParseError> {
    let mut stats = ClientRpcStats::default();
    for_each_line(reader, "nfs client stats", |keyword, values| {
        match keyword {
            "net" => stats.network = Some(Network::decode(values)?),
            "rpc" => stats.client_rpc = Some(ClientRpc::decode(values)?),
            "proc2" => stats.v2_stats = Some(V2Stats::decode(values)?),
            "proc3" => stats.v3_stats = Some(V3Stats::decode(values)?),
            "proc4" => stats.client_v4_stats = Some(ClientV4Stats::decode(values)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(stats)
}

/// Parses the contents of `/proc/net/rpc/nfsd`.
pub fn parse_server_rpc_stats(reader: impl BufRead) -> Result<ServerRpcStats, ParseError> {
    let mut stats = ServerRpcStats::default();
    for_each_line(reader, "nfs server stats", |keyword, values| {
        match keyword {
            "rc" => stats.reply_cache = Some(ReplyCache::decode(values)?),
            "fh" => stats.file_handles = Some(FileHandles::decode(values)?),
            "io" => stats.input_output = Some(InputOutput::decode(values)?),
            "th" => stats.threads = Some(Threads::decode(values)?),
            "ra" => stats.read_ahead_cache = Some(ReadAheadCache::decode(values)?),
            "net" => stats.network = Some(Network::decode(values)?),
            "rpc" => stats.server_rpc = Some(ServerRpc::decode(values)?),
            "proc2" => stats.v2_stats = Some(V2Stats::decode(values)?),
            "proc3" => stats.v3_stats = Some(V3Stats::decode(values)?),
            "proc4" => stats.server_v4_stats = Some(ServerV4Stats::decode(values)?),
            "proc4ops" => stats.v4_ops = Some(V4Ops::decode(values)?),
            "wdeleg_getattr" => {
                stats.wdeleg_getattr = Some(WDELEG_GETATTR.decode(values)?.at(0));
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(stats)
}
