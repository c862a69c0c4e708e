use std::fmt;
use std::io;

/// Failures that end the server process.
///
/// Faults local to a single connection never become a `ServerError`; they
/// are logged and dropped at the connection boundary.
#[derive(Debug)]
pub enum ServerError {
    /// The directory to serve is missing or unreadable, or logging could
    /// not be set up.
    Configuration(String),
    /// Both the requested port and the fallback port are taken.
    PortInUse { requested: u16, fallback: u16 },
    /// Any other failure to bind the listener.
    Bind { port: u16, source: io::Error },
    /// The accept loop could not continue.
    Serve(io::Error),
}

impl ServerError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::PortInUse { .. } | Self::Bind { .. } | Self::Serve(_) => 1,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Self::PortInUse {
                requested,
                fallback,
            } if requested == fallback => write!(
                f,
                "Port {} is already in use. Please free up a port and try again.",
                requested
            ),
            Self::PortInUse { fallback, .. } => write!(
                f,
                "Port {} is also in use. Please free up a port and try again.",
                fallback
            ),
            Self::Bind { port, source } => {
                write!(f, "Error starting server on port {}: {}", port, source)
            }
            Self::Serve(e) => write!(f, "Server error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
            Self::Serve(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn configuration_errors_use_a_distinct_exit_code() {
        let config = ServerError::Configuration("bad dir".into());
        let bind = ServerError::PortInUse {
            requested: 8000,
            fallback: 8080,
        };

        assert_eq!(config.exit_code(), 2);
        assert_eq!(bind.exit_code(), 1);
        assert_ne!(config.exit_code(), 0);
    }

    #[test]
    fn port_in_use_names_the_fallback_port() {
        let err = ServerError::PortInUse {
            requested: 8000,
            fallback: 8080,
        };
        assert!(err.to_string().contains("Port 8080 is also in use"));
    }

    #[test]
    fn bind_error_exposes_its_source() {
        let err = ServerError::Bind {
            port: 80,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        assert!(err.source().is_some());
        assert!(err.to_string().contains("port 80"));
    }
}
