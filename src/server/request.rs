use log::debug;
use std::fmt;
use std::io::{self, Read};
use std::net::SocketAddr;

use super::http_status::HttpStatus;

pub const MAX_REQUEST_LINE: usize = 65536;
pub const MAX_HEAD_SIZE: usize = 65536;

const READ_CHUNK: usize = 8192;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub peer: SocketAddr,
}

impl Request {
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }

    /// Target without its query string or fragment.
    pub fn path(&self) -> &str {
        let end = self
            .target
            .find(|c: char| c == '?' || c == '#')
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    pub fn query(&self) -> Option<&str> {
        let start = self.target.find('?')? + 1;
        let rest = &self.target[start..];
        Some(rest.split('#').next().unwrap_or(rest))
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

#[derive(Debug)]
pub enum RequestError {
    /// The client closed the connection without sending anything.
    Closed,
    Io(io::Error),
    /// The request cannot be served; answered with `status`.
    Malformed {
        status: HttpStatus,
        message: String,
        request_line: String,
    },
}

impl RequestError {
    fn malformed(status: HttpStatus, message: String, request_line: &str) -> Self {
        Self::Malformed {
            status,
            message,
            request_line: request_line.to_string(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "connection closed before a request was sent"),
            Self::Io(e) => write!(f, "error reading request: {}", e),
            Self::Malformed {
                status, message, ..
            } => write!(f, "{} {}", status.code(), message),
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reads one request head from `reader`.
///
/// Bytes after the blank line that ends the head are ignored; every
/// connection serves a single request.
pub fn read_request<R: Read>(
    reader: &mut R,
    peer: SocketAddr,
) -> Result<Request, RequestError> {
    let head = read_head(reader)?;
    let text = String::from_utf8_lossy(&head);
    debug!("Read {} byte request head from {}", head.len(), peer);
    parse_head(&text, peer)
}

fn read_head<R: Read>(reader: &mut R) -> Result<Vec<u8>, RequestError> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RequestError::Io(e)),
        };

        if n == 0 {
            if buffer.is_empty() {
                return Err(RequestError::Closed);
            }
            return Ok(buffer);
        }

        buffer.extend_from_slice(&chunk[..n]);

        let line_len = buffer
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(buffer.len());
        if line_len > MAX_REQUEST_LINE {
            let line = String::from_utf8_lossy(&buffer[..64]).into_owned();
            return Err(RequestError::malformed(
                HttpStatus::RequestUriTooLong,
                "Request-URI Too Long".to_string(),
                &line,
            ));
        }

        match head_end(&buffer) {
            Some(end) if end <= MAX_HEAD_SIZE => {
                buffer.truncate(end);
                return Ok(buffer);
            }
            Some(_) => return Err(head_too_large(&buffer)),
            None if buffer.len() > MAX_HEAD_SIZE => return Err(head_too_large(&buffer)),
            None => {}
        }
    }
}

fn head_too_large(buffer: &[u8]) -> RequestError {
    let line = first_line(&String::from_utf8_lossy(buffer)).to_string();
    RequestError::malformed(
        HttpStatus::RequestHeaderFieldsTooLarge,
        "Line too long".to_string(),
        &line,
    )
}

/// Position just past the blank line ending the head, if present.
fn head_end(buffer: &[u8]) -> Option<usize> {
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4);
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim_end_matches('\r')
}

fn parse_head(text: &str, peer: SocketAddr) -> Result<Request, RequestError> {
    let mut lines = text.split('\n').map(|l| l.trim_end_matches('\r'));
    let request_line = lines.next().unwrap_or("");

    let words: Vec<&str> = request_line.split_whitespace().collect();
    if words.len() != 3 {
        return Err(RequestError::malformed(
            HttpStatus::BadRequest,
            format!("Bad request syntax ('{}')", request_line),
            request_line,
        ));
    }

    let (method, target, version) = (words[0], words[1], words[2]);

    let (major, minor) = parse_version(version).ok_or_else(|| {
        RequestError::malformed(
            HttpStatus::BadRequest,
            format!("Bad request version ('{}')", version),
            request_line,
        )
    })?;

    if major >= 2 {
        return Err(RequestError::malformed(
            HttpStatus::HttpVersionNotSupported,
            format!("Invalid HTTP version ({}.{})", major, minor),
            request_line,
        ));
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        } else {
            debug!("Ignoring malformed header line from {}: {:?}", peer, line);
        }
    }

    Ok(Request {
        method: method.to_string(),
        target: collapse_leading_slashes(target),
        version: version.to_string(),
        headers,
        peer,
    })
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let numbers = version.strip_prefix("HTTP/")?;
    let (major, minor) = numbers.split_once('.')?;

    let is_number =
        |s: &str| !s.is_empty() && s.len() <= 10 && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(major) || !is_number(minor) {
        return None;
    }

    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// `//host/path` style targets would otherwise be taken as
/// scheme-relative URLs in redirects.
fn collapse_leading_slashes(target: &str) -> String {
    if target.starts_with("//") {
        format!("/{}", target.trim_start_matches('/'))
    } else {
        target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn read(raw: &str) -> Result<Request, RequestError> {
        read_request(&mut Cursor::new(raw.as_bytes().to_vec()), peer())
    }

    #[test]
    fn parses_request_line_and_headers() {
        let req = read("GET /index.html?v=1 HTTP/1.1\r\nHost: localhost\r\nOrigin: x\r\n\r\n")
            .unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.query(), Some("v=1"));
        assert_eq!(
            req.headers,
            vec![
                ("Host".to_string(), "localhost".to_string()),
                ("Origin".to_string(), "x".to_string()),
            ]
        );
        assert_eq!(req.request_line(), "GET /index.html?v=1 HTTP/1.1");
    }

    #[test]
    fn accepts_bare_newlines() {
        let req = read("HEAD / HTTP/1.0\n\n").unwrap();
        assert!(req.is_head());
        assert_eq!(req.path(), "/");
    }

    #[test]
    fn empty_connection_is_closed() {
        assert!(matches!(read(""), Err(RequestError::Closed)));
    }

    #[test]
    fn head_without_blank_line_is_parsed_at_eof() {
        let req = read("GET /a.txt HTTP/1.0\r\n").unwrap();
        assert_eq!(req.path(), "/a.txt");
    }

    #[test]
    fn garbage_request_line_is_bad_request() {
        match read("HELLO\r\n\r\n") {
            Err(RequestError::Malformed { status, message, .. }) => {
                assert_eq!(status, HttpStatus::BadRequest);
                assert!(message.starts_with("Bad request syntax"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_version_is_rejected() {
        match read("GET / HTTX/1.1\r\n\r\n") {
            Err(RequestError::Malformed { status, message, .. }) => {
                assert_eq!(status, HttpStatus::BadRequest);
                assert!(message.starts_with("Bad request version"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn http2_is_not_supported() {
        match read("GET / HTTP/2.0\r\n\r\n") {
            Err(RequestError::Malformed { status, .. }) => {
                assert_eq!(status, HttpStatus::HttpVersionNotSupported)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_request_line_is_rejected() {
        let raw = format!("GET /{} HTTP/1.1", "a".repeat(MAX_REQUEST_LINE + 10));
        match read(&raw) {
            Err(RequestError::Malformed { status, .. }) => {
                assert_eq!(status, HttpStatus::RequestUriTooLong)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_request_line_with_terminator_is_rejected() {
        let raw = format!(
            "GET /{} HTTP/1.1\r\n\r\n",
            "a".repeat(MAX_REQUEST_LINE + 500)
        );
        match read(&raw) {
            Err(RequestError::Malformed { status, .. }) => {
                assert_eq!(status, HttpStatus::RequestUriTooLong)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn request_line_at_the_limit_is_accepted() {
        let target = format!("/{}", "a".repeat(MAX_REQUEST_LINE - 20));
        let req = read(&format!("GET {} HTTP/1.1\r\n\r\n", target)).unwrap();
        assert_eq!(req.path(), target);
    }

    #[test]
    fn oversized_head_with_terminator_is_rejected() {
        let headers: String = (0..2000)
            .map(|i| format!("X-Filler-{}: {}\r\n", i, "v".repeat(40)))
            .collect();
        let raw = format!("GET / HTTP/1.1\r\n{}\r\n", headers);
        assert!(raw.len() > MAX_HEAD_SIZE);

        match read(&raw) {
            Err(RequestError::Malformed { status, request_line, .. }) => {
                assert_eq!(status, HttpStatus::RequestHeaderFieldsTooLarge);
                assert_eq!(request_line, "GET / HTTP/1.1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn leading_double_slash_is_collapsed() {
        let req = read("GET //evil.example/x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.path(), "/evil.example/x");
    }

    #[test]
    fn fragment_is_not_part_of_query() {
        let req = read("GET /a?b=1#frag HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.query(), Some("b=1"));
        assert_eq!(req.path(), "/a");
    }
}
