use std::time::{Duration, Instant};

/// Scheduling policy for calls to an external service.
#[derive(Clone, Debug, Default)]
pub struct PacingPolicy {
    /// Minimum gap between two successive calls
    pub min_interval: Duration,
    /// Every `block_size` calls the next call waits `block_pause` instead
    pub block_size: u64,
    pub block_pause: Duration,
    /// Optional token bucket cap on top of the fixed pacing
    pub requests_per_min: Option<u64>,
}

impl PacingPolicy {
    /// No waiting at all.
    pub fn unthrottled() -> Self {
        Self::default()
    }
}

/// Single-owner pacer: call `acquire` before every request.
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    calls: u64,
    last_call: Option<Instant>,
    // token bucket: current tokens and time of last refill
    rpm_tokens: (f64, Instant),
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        let capacity = policy.requests_per_min.unwrap_or(0) as f64;
        Self {
            policy,
            calls: 0,
            last_call: None,
            rpm_tokens: (capacity, Instant::now()),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Gap required before the next call given the calls made so far.
    pub fn required_gap(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        if self.policy.block_size > 0 && self.calls % self.policy.block_size == 0 {
            self.policy.block_pause.max(self.policy.min_interval)
        } else {
            self.policy.min_interval
        }
    }

    /// Wait time before the next call at `now`.
    pub fn delay_at(&self, now: Instant) -> Duration {
        match self.last_call {
            Some(last) => self
                .required_gap()
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Waits until the next call is allowed and records it.
    pub async fn acquire(&mut self) {
        let wait = self.delay_at(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        if let Some(rpm) = self.policy.requests_per_min {
            if rpm > 0 {
                self.consume_token(rpm as f64, 60.0).await;
            }
        }
        self.calls += 1;
        self.last_call = Some(Instant::now());
    }

    async fn consume_token(&mut self, capacity: f64, period_secs: f64) {
        // Basic token bucket: refill continuously, wait until a token accumulates
        loop {
            let (ref mut tokens, ref mut last) = self.rpm_tokens;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            let refill_rate = capacity / period_secs; // tokens per second
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                return;
            }
            let secs = (1.0 - *tokens) / refill_rate;
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
