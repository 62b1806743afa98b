//! Client IP resolution for axum services running behind proxies and CDNs.
//!
//! Proxies, load balancers and CDNs record the originating client address in
//! a zoo of vendor-specific headers. This crate walks them in a fixed
//! precedence order (`X-Client-IP`, then the leftmost valid entry of
//! `X-Forwarded-For`, then the CDN and reverse-proxy headers), stripping
//! ports and skipping `unknown` sentinels along the way, and falls back to
//! the socket peer address when no header yields a valid IPv4/IPv6 address.
//!
//! Install [`ClientIpLayer`] on a `Router`, then read the result in handlers
//! with the [`ClientIp`] extractor or [`client_ip`] against the request
//! extensions. Every failure mode collapses to "no IP": the middleware never
//! rejects a request.
//!
//! All headers are treated as equally trustworthy inputs; nothing here
//! defends against spoofing, and downstream code must not assume the address
//! is validated or routable.

mod context;
mod layer;
mod resolve;

pub use context::{ClientIp, client_ip};
pub use layer::{ClientIpLayer, ClientIpService};
pub use resolve::resolve;
