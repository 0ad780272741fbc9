//! Minute-aligned tick clock driving a live strategy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

/// Fires a callback once per minute, aligned to the minute boundary so the
/// strategy always observes freshly rolled bars.
pub struct TickClock {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Time remaining until the next whole minute.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute =
        now.second() as u64 * 1_000 + (now.timestamp_subsec_millis() as u64).min(999);
    Duration::from_millis(60_000 - into_minute)
}

impl TickClock {
    /// Start ticking. The first callback fires at the next minute boundary.
    pub fn start(mut on_tick: impl FnMut(DateTime<Utc>) + Send + 'static) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Acquire) {
                let wait = until_next_minute(Utc::now());
                // Wake early and often enough to notice a stop request.
                let mut remaining = wait;
                while remaining > Duration::ZERO {
                    if stop_flag.load(Ordering::Acquire) {
                        return;
                    }
                    let nap = remaining.min(Duration::from_millis(250));
                    std::thread::sleep(nap);
                    remaining = remaining.saturating_sub(nap);
                }
                if stop_flag.load(Ordering::Acquire) {
                    return;
                }
                on_tick(Utc::now());
            }
        });
        debug!("tick clock started");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop ticking and wait for the timer thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("tick clock stopped");
        }
    }
}

impl Drop for TickClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn boundary_math_is_exact() {
        let now = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(until_next_minute(now), Duration::from_secs(60));

        let now = Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 59).unwrap();
        assert_eq!(until_next_minute(now), Duration::from_secs(1));

        let now = Utc
            .with_ymd_and_hms(2020, 3, 2, 10, 0, 30)
            .unwrap()
            .with_nanosecond(500_000_000)
            .unwrap();
        assert_eq!(until_next_minute(now), Duration::from_millis(29_500));
    }

    #[test]
    fn stop_is_idempotent_and_joins() {
        let mut clock = TickClock::start(|_| {});
        clock.stop();
        clock.stop();
    }
}
