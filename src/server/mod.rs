pub mod config;
pub mod connection;
pub mod error;
pub mod files;
pub mod http_status;
pub mod listener;
pub mod middleware;
pub mod request;
pub mod response;
mod select;
pub mod transfer;
mod url;

use log::{debug, error, info};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use config::{FALLBACK_PORT, ServerConfig};
use connection::handle_connection;
use error::ServerError;
use middleware::{Pipeline, pipeline};

/// How long the accept loop waits before re-checking its stop condition.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    root: PathBuf,
    pipeline: Arc<Pipeline>,
}

impl HttpServer {
    /// Validates the root directory and binds the listener, falling back to
    /// port 8080 once if the requested port is taken.
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with(config, FALLBACK_PORT)
    }

    pub fn bind_with(config: &ServerConfig, fallback_port: u16) -> Result<Self, ServerError> {
        let root = config.resolve_root()?;
        let listener =
            listener::bind_with_fallback(config.bind_host(), config.port, fallback_port)?;

        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            port: config.port,
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::Bind {
                port: local_addr.port(),
                source,
            })?;

        info!("Serving {:?} on {}", root, local_addr);

        Ok(Self {
            listener,
            local_addr,
            pipeline: Arc::new(pipeline(root.clone())),
            root,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn announce(&self) {
        info!("Starting server on port {}...", self.port());
        info!("Open your browser and visit: http://localhost:{}", self.port());
        info!("Press Ctrl+C to stop the server");
    }

    /// Accepts connections until `should_stop` returns true, handing each
    /// one to its own thread.
    pub fn run<F: Fn() -> bool>(&self, should_stop: F) -> Result<(), ServerError> {
        let listener_fd = self.listener.as_raw_fd();
        let mut total_connections: u64 = 0;

        while !should_stop() {
            if !select::wait_readable(listener_fd, POLL_INTERVAL).map_err(ServerError::Serve)? {
                continue;
            }
            self.accept_new_connection(&mut total_connections);
        }

        debug!("Accept loop finished after {} connections", total_connections);
        Ok(())
    }

    fn accept_new_connection(&self, total_connections: &mut u64) {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    error!("Failed to set blocking mode for {}: {}", addr, e);
                    return;
                }

                *total_connections += 1;
                debug!("Accepted connection from {} (total: {})", addr, total_connections);

                let pipeline = Arc::clone(&self.pipeline);
                let spawned = thread::Builder::new()
                    .name(format!("conn-{}", total_connections))
                    .spawn(move || handle_connection(stream, addr, pipeline.as_ref()));

                if let Err(e) = spawned {
                    error!("Failed to spawn worker for {}: {}", addr, e);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::Interrupted
                        | io::ErrorKind::ConnectionAborted
                ) => {}
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Logs how the accept loop ended and returns the process exit code.
pub fn report_shutdown(result: &Result<(), ServerError>) -> u8 {
    match result {
        Ok(()) => {
            info!("Server stopped by user");
            0
        }
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        info!("Server shutdown complete ({} released)", self.local_addr);
    }
}
