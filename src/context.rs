//! Request-scoped storage and retrieval of the resolved client IP.
//!
//! The middleware stows the resolution outcome in the request's
//! [`Extensions`] under a private newtype, so the type-keyed map acts as a
//! collision-proof key; nothing outside this crate can write it. Handlers
//! read it back with [`client_ip`], or as an Axum extractor:
//!
//! ```ignore
//! async fn handler(ClientIp(ip): ClientIp, ...) -> impl IntoResponse { ... }
//! ```

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::StatusCode;
use http::Extensions;
use http::request::Parts;
use std::convert::Infallible;
use std::net::IpAddr;

/// Extension slot written by the middleware. Holds the outcome even when
/// resolution found nothing, so "layer ran, no IP" is representable.
#[derive(Debug, Clone, Copy)]
struct ResolvedClientIp(Option<IpAddr>);

pub(crate) fn attach(extensions: &mut Extensions, ip: Option<IpAddr>) {
    extensions.insert(ResolvedClientIp(ip));
}

/// The client IP resolved by the middleware, if any.
///
/// `None` when the middleware is not installed on this route or when
/// resolution came up empty. Never panics.
pub fn client_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions.get::<ResolvedClientIp>().and_then(|slot| slot.0)
}

/// The resolved client IP address, as an extractor.
///
/// The mandatory form rejects with a 500 when no IP could be determined;
/// use `Option<ClientIp>` in handlers that can tolerate absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        client_ip(&parts.extensions).map(ClientIp).ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to determine client IP",
        ))
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(client_ip(&parts.extensions).map(ClientIp))
    }
}
