use clap::Parser;
use cors_file_server::logger::{self, LogOptions};
use cors_file_server::server::report_shutdown;
use cors_file_server::{HttpServer, ServerConfig, signals};
use log::{error, info, warn};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = ServerConfig::parse();

    if let Err(e) = logger::init(&LogOptions::new(config.log_file.clone(), config.log_tz)) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::from(2);
    }

    info!("Starting static file server with config: {:?}", config);

    if let Err(e) = signals::install() {
        warn!("Could not install signal handlers: {}", e);
    }

    let server = match HttpServer::bind(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    server.announce();

    let code = report_shutdown(&server.run(signals::interrupted));

    drop(server);
    ExitCode::from(code)
}
