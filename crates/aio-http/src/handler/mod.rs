//! Request handler contract.
//!
//! A handler receives the parsed method and target plus an [`Exchange`] bound
//! to the session, and must hand back the [`Disposition`] the exchange
//! produced. Since a `Disposition` can only be obtained from
//! [`Exchange::send`] or [`Exchange::defer`], a handler cannot return without
//! either answering or explicitly deferring.

use http::{Method, Uri};

use crate::session::{Disposition, Exchange};

pub trait Handler: Send + Sync {
    fn call(&self, method: &Method, uri: &Uri, exchange: Exchange<'_>) -> Disposition;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Method, &Uri, Exchange<'_>) -> Disposition + Send + Sync,
{
    fn call(&self, method: &Method, uri: &Uri, exchange: Exchange<'_>) -> Disposition {
        (self.f)(method, uri, exchange)
    }
}

/// Builds a [`Handler`] from a closure.
///
/// ```
/// use aio_http::handler::make_handler;
/// use http::StatusCode;
///
/// let handler = make_handler(|_method, uri, mut exchange| {
///     let body = format!("you asked for {}", uri.path());
///     if exchange.set_content_type("text/plain").is_err() {
///         return exchange.send(StatusCode::INTERNAL_SERVER_ERROR, "");
///     }
///     exchange.send(StatusCode::OK, body)
/// });
/// # let _ = handler;
/// ```
pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Method, &Uri, Exchange<'_>) -> Disposition + Send + Sync,
{
    HandlerFn { f }
}
