use std::time::{SystemTime, UNIX_EPOCH};

#[path = "utils_test.rs"]
mod utils_test;

/// Wall-clock seconds since the epoch
pub fn realtime() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// User plus system CPU seconds consumed by this process
pub fn cputime() -> f64 {
    let rusage = unsafe {
        let mut rusage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, rusage.as_mut_ptr()) != 0 {
            return 0.0;
        }
        rusage.assume_init()
    };
    let user_time = rusage.ru_utime;
    let sys_time = rusage.ru_stime;
    (user_time.tv_sec as f64 + user_time.tv_usec as f64 * 1e-6)
        + (sys_time.tv_sec as f64 + sys_time.tv_usec as f64 * 1e-6)
}
