use std::sync::atomic::{AtomicUsize, Ordering};

/// A thread-safe reference counter that can be incremented and decremented by multiple
/// holders, and that refuses to move away from zero once it got there.
///
/// `RefCounter` uses atomic compare-and-exchange loops so that the transition to zero is
/// observed by exactly one caller, which makes it suitable for "release exactly once"
/// protocols.
pub struct RefCounter(AtomicUsize);

impl RefCounter {
    /// Creates a new `RefCounter` with the given initial count.
    ///
    /// # Arguments
    ///
    /// * `count` - The initial value of the counter.
    pub fn new(count: usize) -> RefCounter {
        RefCounter(AtomicUsize::new(count))
    }

    /// Attempts to increment the counter.
    ///
    /// The increment succeeds only while the counter is non-zero: a counter that has
    /// dropped to zero stays at zero, so a released resource cannot be resurrected.
    ///
    /// # Returns
    ///
    /// `true` if the counter was incremented, `false` if it was already zero.
    pub fn try_increment(&self) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current != 0 {
            match self.0.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Attempts to decrement the counter.
    ///
    /// # Returns
    ///
    /// The new value of the counter, or `None` if the counter was already zero (in which
    /// case it remains unchanged).
    pub fn try_decrement(&self) -> Option<usize> {
        let mut current = self.0.load(Ordering::Relaxed);
        while current != 0 {
            match self.0.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(current - 1),
                Err(updated) => current = updated,
            }
        }
        None
    }

    /// Attempts to decrement the counter, as long as its value stays above `threshold`.
    ///
    /// # Returns
    ///
    /// `true` if the counter was decremented, `false` if the current value was not
    /// greater than `threshold`.
    pub fn decrement_above(&self, threshold: usize) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current > threshold {
            match self.0.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Unconditionally increments the counter.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Release);
    }

    /// Returns the counter value (most likely stale by the time it is observed by the caller).
    pub fn read(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RefCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefCounter").field(&self.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[test]
    fn test_new() {
        let counter = RefCounter::new(1);
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_try_increment() {
        let counter = RefCounter::new(1);
        assert!(counter.try_increment());
        assert_eq!(counter.read(), 2);
    }

    #[test]
    fn test_try_increment_at_zero() {
        let counter = RefCounter::new(0);
        assert!(!counter.try_increment());
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn test_try_decrement() {
        let counter = RefCounter::new(2);
        assert_eq!(counter.try_decrement(), Some(1));
        assert_eq!(counter.try_decrement(), Some(0));
        assert_eq!(counter.try_decrement(), None);
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn test_decrement_above() {
        let counter = RefCounter::new(3);
        assert!(counter.decrement_above(1));
        assert!(counter.decrement_above(1));
        assert!(!counter.decrement_above(1));
        assert_eq!(counter.read(), 1);
    }

    #[test]
    fn test_increment() {
        let counter = RefCounter::new(0);
        counter.increment();
        counter.increment();
        assert_eq!(counter.read(), 2);
    }

    #[test]
    fn test_concurrent_increment_and_decrement() {
        let counter = Arc::new(RefCounter::new(1));
        let num_threads = 10;
        let mut handles = vec![];

        for _ in 0..num_threads {
            let counter_ref = counter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    assert!(counter_ref.try_increment());
                    std::thread::sleep(Duration::from_millis(1)); // Introduce some contention
                    assert!(counter_ref.try_decrement().is_some());
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.read(), 1);
    }

    #[test]
    fn test_concurrent_decrement_reaches_zero_once() {
        let counter = Arc::new(RefCounter::new(100));
        let mut handles = vec![];

        for _ in 0..10 {
            let counter_ref = counter.clone();
            handles.push(std::thread::spawn(move || {
                let mut zero_hits = 0;
                for _ in 0..10 {
                    if counter_ref.try_decrement() == Some(0) {
                        zero_hits += 1;
                    }
                }
                zero_hits
            }));
        }

        let zero_hits: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(zero_hits, 1);
        assert_eq!(counter.read(), 0);
    }
}
