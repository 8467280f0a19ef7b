pub mod clock;
pub mod tcp;
pub mod udp;

#[cfg(unix)]
pub mod unix;

use std::time::Duration;

// Fallback pause when readiness polling is unavailable; short enough to
// keep the periodic timer responsive.
pub(crate) fn idle_wait(max_wait_ms: u64) {
    std::thread::sleep(Duration::from_millis(max_wait_ms.min(10)));
}

#[cfg(all(feature = "poller", unix))]
pub(crate) fn wait_readable_fd(fd: std::os::fd::BorrowedFd<'_>, max_wait_ms: u64) {
    use polling::{Event, Events, Poller};
    use std::os::fd::AsRawFd;

    let Ok(poller) = Poller::new() else {
        idle_wait(max_wait_ms);
        return;
    };
    // The descriptor is removed again below, before the poller drops.
    if unsafe { poller.add(fd.as_raw_fd(), Event::readable(0)) }.is_err() {
        idle_wait(max_wait_ms);
        return;
    }
    let mut events = Events::new();
    let _ = poller.wait(&mut events, Some(Duration::from_millis(max_wait_ms)));
    let _ = poller.delete(fd);
}
