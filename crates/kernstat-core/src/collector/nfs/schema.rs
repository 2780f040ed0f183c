//! Positional field tables for `/proc/net/rpc/nfs{,d}` lines.
//!
//! Field order follows the kernel's print order. Counters a newer kernel
//! appends land in `unmapped` until they are named here.

use crate::parse::Layout;
use crate::parse::counted::counter_record;

counter_record! {
    /// `rc`: server reply cache.
    pub struct ReplyCache = "rc", Layout::Fixed { width: 3 };
    { hits, misses, nocache }
}

counter_record! {
    /// `fh`: server file handle cache.
    pub struct FileHandles = "fh", Layout::Fixed { width: 5 };
    { stale, total_lookups, anon_lookups, dir_no_cache, no_dir_no_cache }
}

counter_record! {
    /// `io`: bytes read and written by the server.
    pub struct InputOutput = "io", Layout::Fixed { width: 2 };
    { read, write }
}

counter_record! {
    /// `th`: server thread pool. Older kernels follow the two counters with
    /// a fractional usage histogram, which is not decoded.
    pub struct Threads = "th", Layout::Prefix { width: 2 };
    { threads, full_cnt }
}

counter_record! {
    /// `ra`: read-ahead cache; hits at each tenth of the cache depth.
    pub struct ReadAheadCache = "ra", Layout::Fixed { width: 12 };
    {
        cache_size,
        depth_10, depth_20, depth_30, depth_40, depth_50,
        depth_60, depth_70, depth_80, depth_90, depth_100,
        not_found,
    }
}

counter_record! {
    /// `net`: packet and connection counts.
    pub struct Network = "net", Layout::Fixed { width: 4 };
    { net_count, udp_count, tcp_count, tcp_connect }
}

counter_record! {
    /// `rpc` as printed by the client.
    pub struct ClientRpc = "rpc", Layout::Fixed { width: 3 };
    { rpc_count, retransmissions, auth_refreshes }
}

counter_record! {
    /// `rpc` as printed by the server.
    pub struct ServerRpc = "rpc", Layout::Fixed { width: 5 };
    { rpc_count, bad_cnt, bad_fmt, bad_auth, bad_clnt }
}

counter_record! {
    /// `proc2`: NFSv2 procedure calls.
    pub struct V2Stats = "proc2", Layout::Counted { min: 18 };
    {
        null, get_attr, set_attr, root, lookup, read_link, read, wr_cache,
        write, create, remove, rename, link, sym_link, mk_dir, rm_dir,
        read_dir, fs_stat,
    }
}

counter_record! {
    /// `proc3`: NFSv3 procedure calls.
    pub struct V3Stats = "proc3", Layout::Counted { min: 22 };
    {
        null, get_attr, set_attr, lookup, access, read_link, read, write,
        create, mk_dir, sym_link, mk_nod, remove, rm_dir, rename, link,
        read_dir, read_dir_plus, fs_stat, fs_info, path_conf, commit,
    }
}

counter_record! {
    /// `proc4` as printed by the client: one counter per NFSv4 operation
    /// the client issues. Older kernels print fewer.
    pub struct ClientV4Stats = "proc4", Layout::Counted { min: 1 };
    {
        null, read, write, commit, open, open_confirm, open_noattr,
        open_downgrade, close, setattr, fs_info, renew, set_client_id,
        set_client_id_confirm, lock, lockt, locku, access, getattr, lookup,
        lookup_root, remove, rename, link, symlink, create, pathconf, stat_fs,
        read_link, read_dir, server_caps, deleg_return, get_acl, set_acl,
        fs_locations, release_lockowner, secinfo, fsid_present, exchange_id,
        create_session, destroy_session, sequence, get_lease_time,
        reclaim_complete, layout_get, get_device_info, layout_commit,
        layout_return, secinfo_no_name, test_state_id, free_state_id,
        get_device_list, bind_conn_to_session, destroy_client_id, seek,
        allocate, deallocate, layout_stats, clone,
    }
}

counter_record! {
    /// `proc4` as printed by the server: NULL and COMPOUND calls.
    pub struct ServerV4Stats = "proc4", Layout::Counted { min: 2 };
    { null, compound }
}

counter_record! {
    /// `proc4ops`: server operations inside COMPOUNDs, indexed by NFSv4
    /// operation number. Numbers 0 to 2 are not operations. Everything
    /// through RELEASE_LOCKOWNER (39) is required.
    pub struct V4Ops = "proc4ops", Layout::Counted { min: 40 };
    {
        op0_unused, op1_unused, op2_future, access, close, commit, create,
        deleg_purge, deleg_return, getattr, getfh, link, lock, lockt, locku,
        lookup, lookupp, nverify, open, open_attr, open_confirm,
        open_downgrade, putfh, put_pub_fh, put_root_fh, read, read_dir,
        read_link, remove, rename, renew, restore_fh, save_fh, secinfo,
        setattr, set_client_id, set_client_id_confirm, verify, write,
        release_lockowner, backchannel_ctl, bind_conn_to_session,
        exchange_id, create_session, destroy_session, free_state_id,
        get_dir_delegation, get_device_info, get_device_list, layout_commit,
        layout_get, layout_return, secinfo_no_name, sequence, set_ssv,
        test_state_id, want_delegation, destroy_client_id,
        reclaim_complete, allocate, copy, copy_notify, deallocate,
        io_advise, layout_error, layout_stats, offload_cancel,
        offload_status, read_plus, seek, write_same, clone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_widths() {
        assert_eq!(V2Stats::SCHEMA.fields.len(), 18);
        assert_eq!(V3Stats::SCHEMA.fields.len(), 22);
        assert_eq!(ClientV4Stats::SCHEMA.fields.len(), 59);
        assert_eq!(V4Ops::SCHEMA.fields.len(), 72);
        assert_eq!(ReadAheadCache::SCHEMA.fields.len(), 12);
        assert_eq!(V4Ops::SCHEMA.fields[39], "release_lockowner");
        assert_eq!(V4Ops::SCHEMA.fields[53], "sequence");
    }
}
