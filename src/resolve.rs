//! Client IP resolution from proxy and CDN headers.
//!
//! Walks a fixed precedence chain of headers that proxies, load balancers
//! and CDNs use to record the originating client address, falling back to
//! the socket peer address when nothing validates. Header values are
//! untrusted and inconsistently formatted: forwarding chains are
//! comma-separated, some proxies append ports, some insert the literal
//! `unknown`, and IPv6 shows up both bare and in `[addr]:port` brackets.

use http::HeaderMap;
use std::net::IpAddr;

/// How a header's value is interpreted.
#[derive(Clone, Copy)]
enum Strategy {
    /// The whole value is one address, parsed strictly as-is.
    Single,
    /// Comma-separated forwarding chain; leftmost valid entry wins.
    ForwardedChain,
}

/// Header precedence, highest first. The first entry that yields a valid
/// address wins; later entries are never consulted.
///
/// `x-forwarded` and `forwarded-for` carry the same semantic as
/// `x-forwarded-for` but are historically parsed as single values here,
/// matching how proxies that still emit them actually populate them.
const HEADER_CHAIN: &[(&str, Strategy)] = &[
    // Amazon EC2, Heroku, and others.
    ("x-client-ip", Strategy::Single),
    // Load balancers (AWS ELB) and most reverse proxies.
    ("x-forwarded-for", Strategy::ForwardedChain),
    // Cloudflare, applied to every request to the origin.
    ("cf-connecting-ip", Strategy::Single),
    // Fastly, and Firebase hosting when forwarded to a cloud function.
    ("fastly-client-ip", Strategy::Single),
    // Akamai and Cloudflare Enterprise.
    ("true-client-ip", Strategy::Single),
    // Default nginx proxy/fcgi.
    ("x-real-ip", Strategy::Single),
    // Rackspace LB and Riverbed Stingray.
    ("x-cluster-client-ip", Strategy::Single),
    ("x-forwarded", Strategy::Single),
    ("forwarded-for", Strategy::Single),
];

/// Resolve the client IP from request headers, falling back to the
/// connection's peer address (which may carry a `:port` suffix).
///
/// Pure function of its inputs; returns `None` only when every header in the
/// precedence chain fails to yield a valid address and the peer address is
/// absent or unparsable. Never panics, never errors.
pub fn resolve(headers: &HeaderMap, peer_addr: Option<&str>) -> Option<IpAddr> {
    for &(name, strategy) in HEADER_CHAIN {
        let Some(value) = header_str(headers, name) else {
            continue;
        };
        let found = match strategy {
            Strategy::Single => value.parse().ok(),
            Strategy::ForwardedChain => from_forwarded_chain(value),
        };
        if found.is_some() {
            return found;
        }
    }

    peer_addr.and_then(|addr| strip_port(addr).parse().ok())
}

/// Leftmost valid address in a comma-separated forwarding chain.
///
/// Proxies append to the right, so the leftmost entry is the original
/// client. Entries that are ports-attached (Azure does this), the literal
/// `unknown` (Squid's `forwarded_for` directive), or otherwise malformed are
/// skipped, continuing rightward until one validates.
fn from_forwarded_chain(value: &str) -> Option<IpAddr> {
    value
        .split(',')
        .map(str::trim)
        .find_map(|token| strip_port(token).parse().ok())
}

/// Strip a trailing `:port` from a `host:port` or `[v6]:port` string,
/// leaving anything else untouched.
///
/// A bare IPv6 literal contains colons but is not a host:port pair; it only
/// qualifies for splitting when the part before the last colon is itself
/// colon-free and the part after parses as a port number.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, port)) = rest.rsplit_once("]:")
            && port.parse::<u16>().is_ok()
        {
            return host;
        }
        return addr;
    }

    if let Some((host, port)) = addr.rsplit_once(':')
        && !host.contains(':')
        && port.parse::<u16>().is_ok()
    {
        return host;
    }

    addr
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
