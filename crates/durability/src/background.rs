//! Background maintenance: a periodic snapshot timer and value-log GC
//! sweep, each on its own `std::thread` (spec §4.4.3, §4.4.5).
//!
//! The core is synchronous end to end, so there is no async runtime to
//! schedule these on; a plain timed loop on a dedicated thread, torn down
//! via a shared stop flag, is the teacher's own pattern for this kind of
//! maintenance task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Runs `tick` repeatedly, spaced `interval` apart, until [`Ticker::stop`]
/// is called (or the `Ticker` is dropped, which stops it and joins).
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a thread that calls `tick` every `interval`, sleeping in
    /// short slices so `stop` is noticed promptly rather than only between
    /// full-length sleeps.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let poll_slice = Duration::from_millis(200).min(interval);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut elapsed = Duration::ZERO;
                while !stop_for_thread.load(Ordering::Relaxed) {
                    std::thread::sleep(poll_slice);
                    elapsed += poll_slice;
                    if elapsed >= interval {
                        elapsed = Duration::ZERO;
                        tick();
                    }
                }
            })
            .expect("spawn background maintenance thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and block until it exits.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ticks_fire_at_the_configured_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_for_tick = count.clone();
        let ticker = Ticker::spawn("test-ticker", Duration::from_millis(50), move || {
            count_for_tick.fetch_add(1, Ordering::Relaxed);
        });
        std::thread::sleep(Duration::from_millis(260));
        ticker.stop();
        let fired = count.load(Ordering::Relaxed);
        assert!(fired >= 3, "expected at least 3 ticks, saw {fired}");
    }

    #[test]
    fn stop_prevents_further_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_for_tick = count.clone();
        let ticker = Ticker::spawn("test-ticker-stop", Duration::from_millis(30), move || {
            count_for_tick.fetch_add(1, Ordering::Relaxed);
        });
        std::thread::sleep(Duration::from_millis(70));
        ticker.stop();
        let after_stop = count.load(Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(70));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
    }
}
