use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Caps outbound JWKS requests to `limit` per rolling minute.
#[derive(Clone)]
pub struct FetchRateLimiter {
    limit: u32,
    window: Duration,
    sent: Arc<Mutex<VecDeque<Instant>>>,
}

impl FetchRateLimiter {
    /// A `limit` of 0 disables limiting.
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            sent: Arc::default(),
        }
    }

    /// Claim a request slot, returning `false` when the window is exhausted.
    pub fn try_acquire(&self) -> bool {
        if self.limit == 0 {
            return true;
        }

        let now = Instant::now();
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(oldest) = sent.front() {
            if now.duration_since(*oldest) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }

        if sent.len() >= self.limit as usize {
            return false;
        }
        sent.push_back(now);
        true
    }
}
