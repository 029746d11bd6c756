/*!
 * Absolute Deadlines
 *
 * Wall-clock (`CLOCK_REALTIME`) deadlines as used by
 * `pthread_cond_timedwait`, with the comparison precision selected by
 * [`DeadlinePrecision`].
 */

use crate::config::DeadlinePrecision;
use crate::errors::{ShimError, ShimResult};
use nix::time::{clock_gettime, ClockId};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A point on the realtime clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

impl Timestamp {
    /// Sample `CLOCK_REALTIME`
    pub fn now() -> Self {
        match clock_gettime(ClockId::CLOCK_REALTIME) {
            Ok(ts) => Self {
                secs: ts.tv_sec() as i64,
                nanos: ts.tv_nsec() as i64,
            },
            // clock_gettime(CLOCK_REALTIME) cannot fail on supported targets,
            // but SystemTime reads the same clock.
            Err(_) => {
                let since = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::ZERO);
                Self {
                    secs: since.as_secs() as i64,
                    nanos: since.subsec_nanos() as i64,
                }
            }
        }
    }

    fn add(self, d: Duration) -> Self {
        let mut secs = self.secs.saturating_add(d.as_secs() as i64);
        let mut nanos = self.nanos + d.subsec_nanos() as i64;
        if nanos >= NANOS_PER_SEC {
            secs = secs.saturating_add(1);
            nanos -= NANOS_PER_SEC;
        }
        Self { secs, nanos }
    }
}

/// Absolute deadline for a timed condition wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Timestamp,
}

impl Deadline {
    /// Validate an absolute `timespec`
    pub fn from_timespec(ts: &libc::timespec) -> ShimResult<Self> {
        let nanos = ts.tv_nsec as i64;
        if !(0..NANOS_PER_SEC).contains(&nanos) {
            return Err(ShimError::InvalidDeadline(nanos));
        }
        Ok(Self {
            at: Timestamp {
                secs: ts.tv_sec as i64,
                nanos,
            },
        })
    }

    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Timestamp::now().add(timeout),
        }
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.at
    }

    pub fn as_timespec(&self) -> libc::timespec {
        // SAFETY: timespec is plain data; zeroed also covers private padding
        // fields some targets carry.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = self.at.secs as libc::time_t;
        ts.tv_nsec = self.at.nanos as _;
        ts
    }

    /// Whether `now` is past the deadline
    ///
    /// `WholeSeconds` only reports expiry once the seconds counter has moved
    /// beyond the deadline's, so it can run up to a second late.
    #[inline]
    pub fn is_expired_at(&self, now: Timestamp, precision: DeadlinePrecision) -> bool {
        match precision {
            DeadlinePrecision::Precise => now >= self.at,
            DeadlinePrecision::WholeSeconds => now.secs > self.at.secs,
        }
    }

    #[inline]
    pub fn is_expired(&self, precision: DeadlinePrecision) -> bool {
        self.is_expired_at(Timestamp::now(), precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(secs: i64, nanos: i64) -> Timestamp {
        Timestamp { secs, nanos }
    }

    #[test]
    fn test_rejects_out_of_range_nanos() {
        let mut raw: libc::timespec = unsafe { std::mem::zeroed() };
        raw.tv_nsec = NANOS_PER_SEC as _;
        assert_eq!(
            Deadline::from_timespec(&raw),
            Err(ShimError::InvalidDeadline(NANOS_PER_SEC))
        );
        raw.tv_nsec = -1;
        assert!(Deadline::from_timespec(&raw).is_err());
    }

    #[test]
    fn test_whole_seconds_ignores_subsecond_remainder() {
        let mut raw: libc::timespec = unsafe { std::mem::zeroed() };
        raw.tv_sec = 100;
        raw.tv_nsec = 500_000_000;
        let d = Deadline::from_timespec(&raw).unwrap();

        let now = ts(100, 900_000_000);
        assert!(d.is_expired_at(now, DeadlinePrecision::Precise));
        assert!(!d.is_expired_at(now, DeadlinePrecision::WholeSeconds));
        assert!(d.is_expired_at(ts(101, 0), DeadlinePrecision::WholeSeconds));
    }

    #[test]
    fn test_after_normalizes_nanos() {
        let d = Deadline::after(Duration::from_millis(1999));
        let at = d.timestamp();
        assert!((0..NANOS_PER_SEC).contains(&at.nanos));
        assert!(!d.is_expired(DeadlinePrecision::Precise));
    }

    #[test]
    fn test_timespec_roundtrip() {
        let d = Deadline::after(Duration::from_secs(3));
        assert_eq!(Deadline::from_timespec(&d.as_timespec()).unwrap(), d);
    }

    proptest! {
        #[test]
        fn prop_whole_seconds_never_expires_first(
            dl_secs in 0i64..1_000_000,
            dl_nanos in 0i64..NANOS_PER_SEC,
            now_secs in 0i64..1_000_000,
            now_nanos in 0i64..NANOS_PER_SEC,
        ) {
            let mut raw: libc::timespec = unsafe { std::mem::zeroed() };
            raw.tv_sec = dl_secs as libc::time_t;
            raw.tv_nsec = dl_nanos as _;
            let d = Deadline::from_timespec(&raw).unwrap();
            let now = ts(now_secs, now_nanos);
            if d.is_expired_at(now, DeadlinePrecision::WholeSeconds) {
                prop_assert!(d.is_expired_at(now, DeadlinePrecision::Precise));
            }
            // Coarse comparison lags by less than one second.
            let later = ts(now_secs + 1, now_nanos);
            if d.is_expired_at(now, DeadlinePrecision::Precise) {
                prop_assert!(d.is_expired_at(later, DeadlinePrecision::WholeSeconds));
            }
        }
    }
}
