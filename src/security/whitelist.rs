//! Source address whitelist.
//!
//! Entries are CIDR blocks, IP literals, or anything else, which is then
//! compared as a plain string against the peer's host part. A malformed
//! entry never fails config loading; it simply only matches itself.

use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhitelistEntry {
    Network(IpNet),
    Address(IpAddr),
    Literal(String),
}

impl WhitelistEntry {
    pub fn parse(entry: &str) -> Self {
        if let Ok(net) = entry.parse::<IpNet>() {
            WhitelistEntry::Network(net)
        } else if let Ok(addr) = entry.parse::<IpAddr>() {
            WhitelistEntry::Address(addr.to_canonical())
        } else {
            WhitelistEntry::Literal(entry.to_string())
        }
    }

    fn matches(&self, host: &str, ip: Option<IpAddr>) -> bool {
        match (self, ip) {
            (WhitelistEntry::Network(net), Some(ip)) => net.contains(&ip),
            (WhitelistEntry::Address(addr), Some(ip)) => *addr == ip,
            (WhitelistEntry::Literal(literal), _) => literal == host,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
}

impl Whitelist {
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        Self {
            entries: entries.iter().map(|e| WhitelistEntry::parse(e.as_ref())).collect(),
        }
    }

    /// Whether the peer at `remote` (`host:port`) is whitelisted.
    pub fn allows(&self, remote: &str) -> bool {
        let host = host_of(remote);
        let ip = host.parse::<IpAddr>().ok().map(|ip| ip.to_canonical());
        self.entries.iter().any(|entry| entry.matches(host, ip))
    }
}

/// Strip the port and IPv6 brackets from a `host:port` address.
pub fn host_of(remote: &str) -> &str {
    let host = match remote.rsplit_once(':') {
        Some((host, _port)) => host,
        None => remote,
    };
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}
