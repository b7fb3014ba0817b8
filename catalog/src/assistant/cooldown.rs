//! Per-client cooldown for interactive LLM requests.

use std::time::Duration;

use moka::sync::Cache;

const MAX_CLIENTS: u64 = 10_000;

/// Short-lived "request in progress" markers keyed by scope and client.
pub struct Cooldown {
    markers: Cache<String, ()>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        let markers = Cache::builder()
            .max_capacity(MAX_CLIENTS)
            .time_to_live(window)
            .build();
        Self { markers }
    }

    /// Place a marker for `client` in `scope`. Returns false when a live
    /// marker is already there.
    pub fn try_acquire(&self, scope: &str, client: &str) -> bool {
        self.markers
            .entry(format!("{scope}:{client}"))
            .or_insert(())
            .is_fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_in_window_is_refused() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        assert!(cooldown.try_acquire("qa", "127.0.0.1"));
        assert!(!cooldown.try_acquire("qa", "127.0.0.1"));
    }

    #[test]
    fn scopes_and_clients_are_independent() {
        let cooldown = Cooldown::new(Duration::from_secs(10));
        assert!(cooldown.try_acquire("qa", "10.0.0.1"));
        assert!(cooldown.try_acquire("diagram", "10.0.0.1"));
        assert!(cooldown.try_acquire("qa", "10.0.0.2"));
    }

    #[test]
    fn marker_expires_after_window() {
        let cooldown = Cooldown::new(Duration::from_millis(50));
        assert!(cooldown.try_acquire("analysis", "console"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(cooldown.try_acquire("analysis", "console"));
    }
}
