use log::info;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use super::files::StaticFiles;
use super::request::Request;
use super::response::Response;
use crate::logger::ACCESS_TARGET;

/// Something that turns a parsed request into a response.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Response;
}

/// The handler stack every connection goes through.
pub type Pipeline = AccessLog<Cors<StaticFiles>>;

pub fn pipeline(root: PathBuf) -> Pipeline {
    AccessLog::new(Cors::new(StaticFiles::new(root)))
}

pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "X-Requested-With"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Appends the permissive CORS header lines. The two
/// `Access-Control-Allow-Headers` lines stay separate.
pub fn add_cors_headers(mut response: Response) -> Response {
    for (name, value) in CORS_HEADERS {
        response.add_header(name, value);
    }
    response
}

pub struct Cors<H> {
    inner: H,
}

impl<H: Handler> Cors<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: Handler> Handler for Cors<H> {
    fn handle(&self, request: &Request) -> Response {
        add_cors_headers(self.inner.handle(request))
    }
}

pub struct AccessLog<H> {
    inner: H,
}

impl<H: Handler> AccessLog<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: Handler> Handler for AccessLog<H> {
    fn handle(&self, request: &Request) -> Response {
        let response = self.inner.handle(request);
        log_response(request.peer, &request.request_line(), &response);
        response
    }
}

/// Emits an access line of the form `<client-ip> - <message>`.
pub fn log_client(peer: SocketAddr, message: fmt::Arguments<'_>) {
    info!(target: ACCESS_TARGET, "{}", client_line(peer, message));
}

pub fn client_line(peer: SocketAddr, message: fmt::Arguments<'_>) -> String {
    format!("{} - {}", peer.ip(), message)
}

pub fn log_response(peer: SocketAddr, request_line: &str, response: &Response) {
    let code = response.status.code();

    if response.status.is_error() {
        if let Some(message) = &response.message {
            log_client(peer, format_args!("code {}, message {}", code, message));
        }
    }

    log_client(peer, format_args!("\"{}\" {} -", request_line, code));
}
