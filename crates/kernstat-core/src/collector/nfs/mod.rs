//! NFS client and server RPC statistics from `/proc/net/rpc`.

mod parser;
pub mod schema;

pub use parser::{ClientRpcStats, ServerRpcStats, parse_client_rpc_stats, parse_server_rpc_stats};
