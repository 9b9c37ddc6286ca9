//! Sliding-window request limiter
//!
//! One window of request timestamps covering the last hour, shared by every
//! caller of a provider. A request is admitted only when both the per-minute
//! and the per-hour caps have headroom.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    per_minute: usize,
    per_hour: usize,
    window: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute: per_minute as usize,
            per_hour: per_hour as usize,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.has_capacity_at(Instant::now())
    }

    /// Check and record in one step. Returns false when denied.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn has_capacity_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut window, now);
        self.admits(&window, now)
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut window, now);
        if !self.admits(&window, now) {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Requests recorded in the last minute and the last hour
    pub fn usage_at(&self, now: Instant) -> (usize, usize) {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        Self::prune(&mut window, now);
        (Self::last_minute(&window, now), window.len())
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = window.front() {
            if now.saturating_duration_since(*front) >= HOUR {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn last_minute(window: &VecDeque<Instant>, now: Instant) -> usize {
        window
            .iter()
            .rev()
            .take_while(|ts| now.saturating_duration_since(**ts) < MINUTE)
            .count()
    }

    fn admits(&self, window: &VecDeque<Instant>, now: Instant) -> bool {
        window.len() < self.per_hour && Self::last_minute(window, now) < self.per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_minute_cap() {
        let limiter = SlidingWindowLimiter::new(2, 100);
        let t0 = Instant::now();
        assert!(limiter.try_acquire_at(t0));
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(1)));
        assert!(!limiter.has_capacity_at(t0 + Duration::from_secs(2)));
        assert!(!limiter.try_acquire_at(t0 + Duration::from_secs(2)));
        // Denials are not recorded
        assert_eq!(limiter.usage_at(t0 + Duration::from_secs(2)), (2, 2));
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_hour_cap() {
        let limiter = SlidingWindowLimiter::new(10, 3);
        let t0 = Instant::now();
        for i in 0..3 {
            assert!(limiter.try_acquire_at(t0 + Duration::from_secs(i * 120)));
        }
        assert!(!limiter.try_acquire_at(t0 + Duration::from_secs(600)));
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(3601)));
    }

    #[test]
    fn test_zero_cap_denies_everything() {
        let limiter = SlidingWindowLimiter::new(0, 100);
        assert!(!limiter.has_capacity());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_shared_across_threads() {
        let limiter = Arc::new(SlidingWindowLimiter::new(5, 100));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..4).filter(|_| limiter.try_acquire()).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 5);
    }
}
