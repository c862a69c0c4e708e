use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT and SIGTERM to the interrupt flag and ignores SIGPIPE so
/// a vanished client shows up as a write error.
pub fn install() -> io::Result<()> {
    let handler = handle_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;

    for signal in [libc::SIGINT, libc::SIGTERM] {
        if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }

    if unsafe { libc::signal(libc::SIGPIPE, libc::SIG_IGN) } == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Whether an interrupt has been received since startup.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
