use ansi_term::Colour;
use chrono_tz::Tz;
use env_logger::{Builder, Env, Target};
use log::{Level, Record};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

/// Records with this target are client access lines and are written
/// without the timestamp prefix. Kept under the crate path so a
/// `RUST_LOG=cors_file_server=...` filter still lets them through.
pub const ACCESS_TARGET: &str = "cors_file_server::access";

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub file: Option<PathBuf>,
    pub time_zone: Tz,
    pub colored: bool,
}

impl LogOptions {
    pub fn new(file: Option<PathBuf>, time_zone: Tz) -> Self {
        Self {
            file,
            time_zone,
            colored: io::stdout().is_terminal(),
        }
    }
}

pub fn init(options: &LogOptions) -> io::Result<()> {
    let log_file = match &options.file {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };
    let time_zone = options.time_zone;
    let colored = options.colored;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format(move |buf, record| {
            let timestamp = timestamp(time_zone);

            if let Some(mut file) = log_file.as_ref() {
                let plain = format_line(record, &timestamp, false);
                // best effort
                let _ = file.write_all(format!("{}\n", plain).as_bytes());
            }

            writeln!(buf, "{}", format_line(record, &timestamp, colored))
        })
        .try_init()
        .map_err(io::Error::other)
}

pub fn timestamp(time_zone: Tz) -> String {
    chrono::Utc::now()
        .with_timezone(&time_zone)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

pub fn format_line(record: &Record, timestamp: &str, colored: bool) -> String {
    if record.target() == ACCESS_TARGET {
        return record.args().to_string();
    }

    let level = if colored {
        let colour = match record.level() {
            Level::Error => Colour::Red,
            Level::Warn => Colour::Yellow,
            Level::Info => Colour::Green,
            Level::Debug => Colour::Blue,
            Level::Trace => Colour::Purple,
        };
        colour.paint(record.level().to_string()).to_string()
    } else {
        record.level().to_string()
    };

    format!(
        "[{} {} {}] {}",
        timestamp,
        level,
        record.module_path().unwrap_or_default(),
        record.args()
    )
}
