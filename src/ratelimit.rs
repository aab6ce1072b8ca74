use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window request ledger keyed by caller identity.
pub struct RateLimitLedger {
    window: Duration,
    max_requests: usize,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimitLedger {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self { window, max_requests, requests: Mutex::new(HashMap::new()) }
    }

    /// Records the request and returns true when `caller` is within budget.
    pub fn check(&self, caller: &str) -> bool {
        self.check_at(caller, Instant::now())
    }

    pub fn check_at(&self, caller: &str, now: Instant) -> bool {
        let mut ledger = self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // drop callers whose whole history has aged out
        ledger.retain(|_, times| times.last().is_some_and(|t| now.saturating_duration_since(*t) < self.window));

        let times = ledger.entry(caller.to_string()).or_default();
        times.retain(|t| now.saturating_duration_since(*t) < self.window);
        if times.len() >= self.max_requests {
            return false;
        }
        times.push(now);
        true
    }
}

impl Default for RateLimitLedger {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let ledger = RateLimitLedger::default();
        let t0 = Instant::now();
        for i in 0..10 {
            assert!(ledger.check_at("1.2.3.4", t0 + Duration::from_secs(i)));
        }
        assert!(!ledger.check_at("1.2.3.4", t0 + Duration::from_secs(30)));
        // other callers have their own budget
        assert!(ledger.check_at("5.6.7.8", t0 + Duration::from_secs(30)));
    }

    #[test]
    fn window_slides() {
        let ledger = RateLimitLedger::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(ledger.check_at("a", t0));
        assert!(ledger.check_at("a", t0 + Duration::from_secs(30)));
        assert!(!ledger.check_at("a", t0 + Duration::from_secs(59)));
        // first request aged out
        assert!(ledger.check_at("a", t0 + Duration::from_secs(60)));
        assert!(!ledger.check_at("a", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn rejected_requests_do_not_extend_the_window() {
        let ledger = RateLimitLedger::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(ledger.check_at("a", t0));
        assert!(!ledger.check_at("a", t0 + Duration::from_secs(5)));
        assert!(ledger.check_at("a", t0 + Duration::from_secs(10)));
    }

    #[test]
    fn concurrent_callers_share_one_ledger() {
        let ledger = std::sync::Arc::new(RateLimitLedger::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = ledger.clone();
                std::thread::spawn(move || (0..10).filter(|_| l.check("shared")).count())
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50);
    }
}
