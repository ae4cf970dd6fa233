//! Process peak resident set size.

/// Peak RSS of this process in bytes, or `None` where `getrusage` does not
/// report it.
#[must_use]
pub fn peak_rss_bytes() -> Option<u64> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        // SAFETY: `rusage` is plain old data; zeroed is a valid value.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        // SAFETY: `usage` is a valid out-pointer for the call.
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
        if rc != 0 {
            return None;
        }
        let maxrss = u64::try_from(usage.ru_maxrss).ok()?;
        // Linux reports kilobytes, macOS bytes.
        if cfg!(target_os = "linux") {
            Some(maxrss * 1024)
        } else {
            Some(maxrss)
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    fn peak_rss_is_reported_and_monotonic() {
        let before = peak_rss_bytes().unwrap();
        assert!(before > 0);
        let block = vec![1u8; 8 << 20];
        std::hint::black_box(&block);
        let after = peak_rss_bytes().unwrap();
        assert!(after >= before);
    }
}
