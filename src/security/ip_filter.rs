//! Source-network whitelist for bank callbacks.
//!
//! The effective client address is resolved with a fixed precedence
//! (X-Forwarded-For first hop, then X-Real-IP, then RFC 7239 `Forwarded`,
//! then the transport peer) and tested against an immutable snapshot of
//! allowed networks. Whitelist reloads build a whole new snapshot and swap
//! it atomically; concurrent checks never see a partial set.

use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid whitelist entry '{entry}'")]
pub struct WhitelistError {
    pub entry: String,
}

/// Immutable set of allowed source networks.
///
/// Entries are single addresses (`10.1.2.3`, `::1`) or CIDR blocks
/// (`10.0.0.0/8`). Addresses only ever match networks of their own family;
/// a v6 peer never matches a v4 block.
#[derive(Debug, Clone, Default)]
pub struct IpWhitelist {
    networks: Vec<IpNet>,
}

impl IpWhitelist {
    /// Parse configuration entries into a whitelist snapshot.
    pub fn parse(entries: &[String]) -> Result<Self, WhitelistError> {
        let mut networks = Vec::with_capacity(entries.len());
        for entry in entries {
            networks.push(parse_entry(entry)?);
        }
        Ok(Self { networks })
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|net| net.contains(&ip))
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

/// Parse one whitelist entry: CIDR notation first, then a bare address
/// mapped to its host-route network (/32 or /128).
pub fn parse_entry(entry: &str) -> Result<IpNet, WhitelistError> {
    let trimmed = entry.trim();
    if let Ok(net) = trimmed.parse::<IpNet>() {
        return Ok(net);
    }
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(IpNet::from(ip));
    }
    Err(WhitelistError {
        entry: entry.to_string(),
    })
}

/// Resolve the effective client address for a request.
///
/// Unparseable header values fall through to the next source rather than
/// failing the request; the transport peer is always a valid last resort.
pub fn client_ip(peer: IpAddr, headers: &HeaderMap) -> IpAddr {
    if let Some(ip) = header_ip(headers, "x-forwarded-for", |v| v.split(',').next()) {
        return ip;
    }
    if let Some(ip) = header_ip(headers, "x-real-ip", Some) {
        return ip;
    }
    if let Some(ip) = forwarded_for(headers) {
        return ip;
    }
    peer
}

fn header_ip<'a>(
    headers: &'a HeaderMap,
    name: &str,
    pick: impl Fn(&'a str) -> Option<&'a str>,
) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    parse_addr(pick(value)?)
}

/// RFC 7239 `Forwarded: for=192.0.2.60;proto=https;by=203.0.113.43`.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get("forwarded")?.to_str().ok()?;
    for part in value.split(';').flat_map(|p| p.split(',')) {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("for=") {
            if let Some(ip) = parse_addr(rest) {
                return Some(ip);
            }
        }
    }
    None
}

/// Tolerates quoting and bracketed IPv6 forms (`"[2001:db8::1]:4711"`).
fn parse_addr(raw: &str) -> Option<IpAddr> {
    let mut s = raw.trim().trim_matches('"');
    if let Some(stripped) = s.strip_prefix('[') {
        s = stripped.split(']').next().unwrap_or(stripped);
    }
    if let Ok(ip) = s.parse::<IpAddr>() {
        return Some(ip);
    }
    // v4 with port, e.g. "192.0.2.60:4711"
    if let Some((host, _)) = s.rsplit_once(':') {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }
    }
    None
}
