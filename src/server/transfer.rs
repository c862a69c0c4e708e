use log::{debug, error};
use std::io::{self, Write};
use std::net::SocketAddr;

use super::middleware::log_client;
use super::response::Response;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transfer {
    Complete { body_bytes: u64 },
    /// The client went away mid-response. Expected, logged, and dropped.
    ClientDisconnected,
    Failed,
}

pub fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

/// Writes `response` to the client. Write failures end here and are
/// reported through the returned [`Transfer`].
pub fn send<W: Write>(
    out: &mut W,
    response: Response,
    head_only: bool,
    peer: SocketAddr,
) -> Transfer {
    match response.write_to(out, head_only) {
        Ok(body_bytes) => {
            debug!("Sent {} body bytes to {}", body_bytes, peer);
            Transfer::Complete { body_bytes }
        }
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            log_client(
                peer,
                format_args!("Broken pipe error during file transfer - client disconnected"),
            );
            Transfer::ClientDisconnected
        }
        Err(e) if is_disconnect(&e) => {
            log_client(
                peer,
                format_args!("Connection reset during file transfer - client disconnected"),
            );
            Transfer::ClientDisconnected
        }
        Err(e) => {
            error!("Error sending response to {}: {}", peer, e);
            Transfer::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ACCESS_TARGET;
    use crate::server::http_status::HttpStatus;
    use crate::server::response::Body;
    use crate::test_log;
    use log::Level;

    /// Accepts `budget` bytes, then fails every write with `kind`.
    struct FlakyClient {
        budget: usize,
        kind: io::ErrorKind,
        received: Vec<u8>,
    }

    impl Write for FlakyClient {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(self.kind, "client gone"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.received.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn big_response() -> Response {
        Response::new(HttpStatus::Ok).with_body(Body::Bytes(vec![7u8; 1 << 20]))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[test]
    fn broken_pipe_is_a_disconnect() {
        test_log::start();
        let mut client = FlakyClient {
            budget: 300,
            kind: io::ErrorKind::BrokenPipe,
            received: Vec::new(),
        };

        let outcome = send(&mut client, big_response(), false, peer());
        assert_eq!(outcome, Transfer::ClientDisconnected);
        assert_eq!(client.received.len(), 300);

        let disconnects: Vec<_> = test_log::take()
            .into_iter()
            .filter(|c| c.target == ACCESS_TARGET)
            .collect();
        assert_eq!(disconnects.len(), 1);
        assert_eq!(disconnects[0].level, Level::Info);
        assert_eq!(
            disconnects[0].message,
            "127.0.0.1 - Broken pipe error during file transfer - client disconnected"
        );
    }

    #[test]
    fn connection_reset_is_a_disconnect() {
        test_log::start();
        let mut client = FlakyClient {
            budget: 10,
            kind: io::ErrorKind::ConnectionReset,
            received: Vec::new(),
        };

        assert_eq!(
            send(&mut client, big_response(), false, peer()),
            Transfer::ClientDisconnected
        );
        let expected = "127.0.0.1 - Connection reset during file transfer - client disconnected";
        assert!(test_log::messages().iter().any(|m| m == expected));
    }

    #[test]
    fn other_errors_are_failures() {
        let mut client = FlakyClient {
            budget: 0,
            kind: io::ErrorKind::Other,
            received: Vec::new(),
        };

        test_log::start();
        assert_eq!(
            send(&mut client, big_response(), false, peer()),
            Transfer::Failed
        );

        let logged = test_log::take();
        assert!(logged.iter().all(|c| c.target != ACCESS_TARGET));
        assert!(logged.iter().any(|c| c.level == Level::Error));
    }

    #[test]
    fn complete_transfer_reports_body_size() {
        let mut out = Vec::new();
        let outcome = send(&mut out, big_response(), false, peer());
        assert_eq!(outcome, Transfer::Complete { body_bytes: 1 << 20 });
    }
}
