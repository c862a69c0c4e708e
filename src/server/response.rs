use std::fs::File;
use std::io::{self, Read, Write};

use super::http_status::HttpStatus;

pub const SERVER_NAME: &str = concat!("cors-file-server/", env!("CARGO_PKG_VERSION"));

const FILE_CHUNK: usize = 65536;

#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    File { file: File, len: u64 },
}

impl Body {
    pub fn content_length(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::File { len, .. } => *len,
        }
    }
}

/// An outgoing response. Headers keep insertion order and may repeat a
/// field name.
#[derive(Debug)]
pub struct Response {
    pub status: HttpStatus,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    /// Explanation attached to error responses, used for logging.
    pub message: Option<String>,
}

impl Response {
    pub fn new(status: HttpStatus) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
            message: None,
        }
    }

    pub fn error(status: HttpStatus, message: impl Into<String>) -> Self {
        let message = message.into();
        let body = format!(
            "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Error response</title>\n</head>\n<body>\n<h1>Error response</h1>\n\
             <p>Error code: {}</p>\n<p>Message: {}.</p>\n</body>\n</html>\n",
            status.code(),
            super::url::html_escape(&message)
        );

        let mut response = Self::new(status)
            .with_header("Content-Type", "text/html;charset=utf-8")
            .with_body(Body::Bytes(body.into_bytes()));
        response.message = Some(message);
        response
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Appends a header line without replacing earlier ones of the same name.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialized status line and headers, including the ones every
    /// response carries.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = self.status.as_response_line();

        head.push_str(&format!("Server: {}\r\n", SERVER_NAME));
        head.push_str(&format!("Date: {}\r\n", http_date()));

        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }

        if self.status.allows_body() && self.header("Content-Length").is_none() {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.content_length()));
        }
        head.push_str("Connection: close\r\n\r\n");

        head.into_bytes()
    }

    /// Writes the whole response, streaming a file body in fixed chunks.
    pub fn write_to<W: Write>(self, out: &mut W, head_only: bool) -> io::Result<u64> {
        out.write_all(&self.head_bytes())?;

        let mut sent = 0u64;
        if !head_only && self.status.allows_body() {
            match self.body {
                Body::Empty => {}
                Body::Bytes(bytes) => {
                    out.write_all(&bytes)?;
                    sent = bytes.len() as u64;
                }
                Body::File { mut file, .. } => {
                    let mut buffer = vec![0u8; FILE_CHUNK];
                    loop {
                        let n = match file.read(&mut buffer) {
                            Ok(0) => break,
                            Ok(n) => n,
                            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                            Err(e) => return Err(e),
                        };
                        out.write_all(&buffer[..n])?;
                        sent += n as u64;
                    }
                }
            }
        }

        out.flush()?;
        Ok(sent)
    }
}

pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
