use libc::{FD_ISSET, FD_SET, FD_ZERO, fd_set, pselect, timespec};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Blocks until `fd` is readable or `timeout` passes.
///
/// A signal arriving during the wait counts as a timeout so the caller
/// can look at its stop flag.
pub fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut read_set: fd_set = unsafe { std::mem::zeroed() };
    unsafe { FD_ZERO(&mut read_set) };
    unsafe { FD_SET(fd, &mut read_set) };

    let timeout = timespec {
        tv_sec: timeout.as_secs() as _,
        tv_nsec: timeout.subsec_nanos() as _,
    };

    let ready_count = unsafe {
        pselect(
            fd + 1,
            &mut read_set,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &timeout,
            std::ptr::null(),
        )
    };

    if ready_count < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }

    Ok(ready_count > 0 && unsafe { FD_ISSET(fd, &mut read_set) })
}
