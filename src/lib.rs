pub mod logger;
pub mod server;
pub mod signals;

#[cfg(test)]
mod test_log;

pub use server::HttpServer;
pub use server::config::ServerConfig;
pub use server::error::ServerError;
