use std::time::Duration;

/// Computes how long to wait before a retry.
///
/// `retry` is 0-indexed: the wait before the first retry is `next_interval(0)`.
pub trait IntervalFunction: Send + Sync {
    fn next_interval(&self, retry: usize) -> Duration;
}

/// The same wait before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// A wait growing by a constant step: `initial + step * retry`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    initial_interval: Duration,
    step: Duration,
    max_interval: Option<Duration>,
}

impl LinearBackoff {
    pub fn new(initial_interval: Duration, step: Duration) -> Self {
        Self {
            initial_interval,
            step,
            max_interval: None,
        }
    }

    /// Caps the wait.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for LinearBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let steps = u32::try_from(retry).unwrap_or(u32::MAX);
        let interval = self
            .initial_interval
            .saturating_add(self.step.saturating_mul(steps));
        cap(interval, self.max_interval)
    }
}

/// A wait multiplied by a constant factor (2.0 by default) on every retry.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps exponential growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        cap(
            exponential(self.initial_interval, self.multiplier, retry),
            self.max_interval,
        )
    }
}

/// Exponential backoff with jitter, so that clients failing together
/// don't retry together.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    initial_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Option<Duration>,
}

impl ExponentialRandomBackoff {
    /// `randomization_factor` is clamped to `0.0..=1.0`; 0.5 spreads each
    /// wait uniformly between 50% and 150% of the exponential value.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
            max_interval: None,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        use rand::Rng;

        let base = cap(
            exponential(self.initial_interval, self.multiplier, retry),
            self.max_interval,
        )
        .as_secs_f64();
        let delta = base * self.randomization_factor;
        if delta <= 0.0 {
            return seconds(base);
        }

        let jittered = rand::rng().random_range((base - delta)..=(base + delta));
        seconds(jittered)
    }
}

/// Backoff computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}

fn exponential(initial: Duration, multiplier: f64, retry: usize) -> Duration {
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    seconds(initial.as_secs_f64() * multiplier.powi(exponent))
}

/// Saturates at `Duration::MAX` instead of panicking on huge values.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

fn cap(interval: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(max) => interval.min(max),
        None => interval,
    }
}
