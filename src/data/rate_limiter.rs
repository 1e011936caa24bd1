use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Request-weight budget over a sliding window, shared by every call to one upstream.
#[derive(Clone)]
pub struct GlobalRateLimiter {
    state: Arc<Mutex<WeightWindow>>,
}

struct WeightWindow {
    limit: u32,
    span: Duration,
    // (when, weight) per admitted call, oldest first
    spent: VecDeque<(Instant, u32)>,
}

impl WeightWindow {
    fn expire(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.spent.front() {
            if now.duration_since(at) < self.span {
                break;
            }
            self.spent.pop_front();
        }
    }

    fn used(&self) -> u32 {
        self.spent.iter().map(|&(_, weight)| weight).sum()
    }
}

impl GlobalRateLimiter {
    /// Budget of `limit` weight per rolling minute.
    pub fn new(limit: u32) -> Self {
        Self::with_window(limit, Duration::from_secs(60))
    }

    pub fn with_window(limit: u32, span: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(WeightWindow {
                limit,
                span,
                spent: VecDeque::new(),
            })),
        }
    }

    /// Waits until `cost` fits in the window, then books it.
    /// A call costing more than the whole budget is admitted once the window is empty.
    pub async fn acquire(&self, cost: u32, context: &str) {
        loop {
            let wait = {
                let mut window = self.state.lock().await;
                let now = Instant::now();
                window.expire(now);

                let used = window.used();
                let Some(&(oldest, _)) = window.spent.front() else {
                    window.spent.push_back((now, cost));
                    return;
                };
                if used + cost <= window.limit {
                    window.spent.push_back((now, cost));
                    return;
                }

                let wait = window.span.saturating_sub(now.duration_since(oldest));
                log::warn!(
                    "Rate limit saturated for [{}]. Used: {}/{}. Waiting {:.1}s",
                    context,
                    used,
                    window.limit,
                    wait.as_secs_f64()
                );
                wait
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Weight booked inside the current window.
    pub async fn used(&self) -> u32 {
        let mut window = self.state.lock().await;
        window.expire(Instant::now());
        window.used()
    }
}
