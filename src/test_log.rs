//! Log capture for unit tests. Records are kept per thread, so tests
//! running in parallel only see what they logged themselves.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Captured)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let captured = Captured {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };
        if let Ok(mut records) = self.records.lock() {
            records.push((thread::current().id(), captured));
        }
    }

    fn flush(&self) {}
}

/// Installs the capturing logger and forgets anything this thread logged
/// before.
pub fn start() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    take();
}

/// Removes and returns this thread's records, oldest first.
pub fn take() -> Vec<Captured> {
    let me = thread::current().id();
    let mut records = LOGGER.records.lock().unwrap();
    let (mine, rest): (Vec<_>, Vec<_>) = records.drain(..).partition(|(id, _)| *id == me);
    *records = rest;
    mine.into_iter().map(|(_, captured)| captured).collect()
}

pub fn messages() -> Vec<String> {
    take().into_iter().map(|c| c.message).collect()
}
