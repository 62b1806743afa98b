//! Tower middleware that resolves the client IP once per request.
//!
//! Install on a `Router` (with `into_make_service_with_connect_info` so the
//! socket peer address is available as a fallback):
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(ClientIpLayer);
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```
//!
//! Resolution failure never fails the request; the outcome (including
//! "nothing found") is attached to the request extensions and the inner
//! service is always invoked.

use crate::context::attach;
use crate::resolve::resolve;
use axum::extract::ConnectInfo;
use http::Request;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use tower::{Layer, Service};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpLayer;

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ClientIpService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for ClientIpService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Peer address is only present when the server was built with
        // `into_make_service_with_connect_info`.
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());

        let ip = resolve(req.headers(), peer.as_deref());
        match ip {
            Some(ip) => tracing::trace!(client_ip = %ip, "Resolved client IP"),
            None => tracing::trace!("Client IP could not be determined"),
        }

        attach(req.extensions_mut(), ip);
        self.inner.call(req)
    }
}
