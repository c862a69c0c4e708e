use log::{info, warn};
use std::io;
use std::net::TcpListener;

use super::error::ServerError;

/// Binds `host:port`, retrying once on `fallback` when the port is taken.
///
/// Only "address in use" triggers the retry. A `fallback` of 0 lets the
/// OS pick the retry port.
pub fn bind_with_fallback(
    host: &str,
    port: u16,
    fallback: u16,
) -> Result<TcpListener, ServerError> {
    match TcpListener::bind((host, port)) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            if port == fallback {
                return Err(ServerError::PortInUse {
                    requested: port,
                    fallback,
                });
            }

            warn!("Port {} is already in use. Trying port {}...", port, fallback);

            match TcpListener::bind((host, fallback)) {
                Ok(listener) => {
                    info!("Falling back to port {}", fallback);
                    Ok(listener)
                }
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(ServerError::PortInUse {
                    requested: port,
                    fallback,
                }),
                Err(source) => Err(ServerError::Bind {
                    port: fallback,
                    source,
                }),
            }
        }
        Err(source) => Err(ServerError::Bind { port, source }),
    }
}
