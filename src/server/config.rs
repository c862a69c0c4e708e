use clap::Parser;
use chrono_tz::Tz;
use std::path::PathBuf;

use super::error::ServerError;

/// Port tried once when the requested one is already taken.
pub const FALLBACK_PORT: u16 = 8080;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Simple HTTP server with CORS headers and error handling",
    long_about = None
)]
pub struct ServerConfig {
    /// Port to run the server on
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Directory to serve files from
    #[arg(long = "dir", default_value = ".")]
    pub directory: PathBuf,

    /// Address to bind; an empty value binds all interfaces
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Also append log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Time zone used for log timestamps
    #[arg(long, default_value = "UTC", value_parser = parse_time_zone)]
    pub log_tz: Tz,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            directory: PathBuf::from("."),
            host: "0.0.0.0".to_string(),
            log_file: None,
            log_tz: Tz::UTC,
        }
    }
}

impl ServerConfig {
    pub fn bind_host(&self) -> &str {
        if self.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.host
        }
    }

    /// Validates the directory to serve and returns its canonical form.
    pub fn resolve_root(&self) -> Result<PathBuf, ServerError> {
        let dir = &self.directory;

        if !dir.exists() {
            return Err(ServerError::Configuration(format!(
                "directory '{}' does not exist",
                dir.display()
            )));
        }

        if !dir.is_dir() {
            return Err(ServerError::Configuration(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }

        if let Err(e) = std::fs::read_dir(dir) {
            return Err(ServerError::Configuration(format!(
                "directory '{}' is not accessible: {}",
                dir.display(),
                e
            )));
        }

        dir.canonicalize().map_err(|e| {
            ServerError::Configuration(format!(
                "cannot resolve directory '{}': {}",
                dir.display(),
                e
            ))
        })
    }
}

fn parse_time_zone(value: &str) -> Result<Tz, String> {
    value
        .parse::<Tz>()
        .map_err(|_| format!("unknown time zone '{}'", value))
}
