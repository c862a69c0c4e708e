use log::{debug, error};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use super::middleware::{Handler, add_cors_headers, log_response};
use super::request::{RequestError, read_request};
use super::response::Response;
use super::transfer::{self, Transfer, is_disconnect};

/// Serves one connection from start to close. Every failure stops here.
pub fn handle_connection<H: Handler + ?Sized>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: &H,
) {
    debug!(
        "[Thread {:?}] Handling connection from {}",
        std::thread::current().id(),
        peer
    );

    if let Some(outcome) = respond(&mut stream, peer, handler) {
        debug!("Connection from {} finished: {:?}", peer, outcome);
    }

    if let Err(e) = stream.shutdown(Shutdown::Write) {
        debug!("Shutdown of {} failed: {}", peer, e);
    }
}

/// Reads one request from `stream` and writes the answer back. Returns
/// `None` when there was nothing to answer.
pub fn respond<S, H>(stream: &mut S, peer: SocketAddr, handler: &H) -> Option<Transfer>
where
    S: Read + Write,
    H: Handler + ?Sized,
{
    let (response, head_only) = match read_request(stream, peer) {
        Ok(request) => (handler.handle(&request), request.is_head()),
        Err(RequestError::Closed) => {
            debug!("Connection closed by client {} before sending a request", peer);
            return None;
        }
        Err(RequestError::Io(e)) if is_disconnect(&e) => {
            debug!("Client {} disconnected while sending its request: {}", peer, e);
            return None;
        }
        Err(RequestError::Io(e)) => {
            error!("Error reading from {}: {}", peer, e);
            return None;
        }
        Err(RequestError::Malformed {
            status,
            message,
            request_line,
        }) => {
            let response = add_cors_headers(Response::error(status, message));
            log_response(peer, &request_line, &response);
            (response, false)
        }
    };

    Some(transfer::send(stream, response, head_only, peer))
}
