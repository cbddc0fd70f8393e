//! Edge handler: the same root redirect for hosts that hand the function a
//! request context and a `next()` continuation instead of a middleware stack.
//!
//! Edge runtimes build requests from the full URL, so the scheme (and with it
//! the cookie's `Secure` flag) comes straight from the request URI.

use std::future::Future;

use axum::extract::Request;
use axum::response::Response;

use crate::config::LocaleConfig;
use crate::redirect::{decide, redirect_response, RedirectRequest};

/// Per-request context handed to an edge function by its host.
pub trait EdgeContext {
    /// The inbound request.
    fn request(&self) -> &Request;

    /// Continue to the host's next handler (usually the static asset server).
    fn next(self) -> impl Future<Output = Response> + Send;
}

/// Edge entry point: redirect `/`, otherwise defer to `context.next()`.
pub async fn on_request<C: EdgeContext>(context: C, config: &LocaleConfig) -> Response {
    let request = context.request();
    let decision = decide(
        &RedirectRequest::from_http(request.uri(), request.headers()),
        config,
    );

    if !decision.should_redirect {
        return context.next().await;
    }

    redirect_response(&decision, config)
}

/// An [`EdgeContext`] whose continuation is a closure receiving the request.
pub struct FnContext<F> {
    request: Request,
    next: F,
}

impl<F, Fut> FnContext<F>
where
    F: FnOnce(Request) -> Fut + Send,
    Fut: Future<Output = Response> + Send,
{
    pub fn new(request: Request, next: F) -> Self {
        Self { request, next }
    }
}

impl<F, Fut> EdgeContext for FnContext<F>
where
    F: FnOnce(Request) -> Fut + Send,
    Fut: Future<Output = Response> + Send,
{
    fn request(&self) -> &Request {
        &self.request
    }

    fn next(self) -> impl Future<Output = Response> + Send {
        (self.next)(self.request)
    }
}
