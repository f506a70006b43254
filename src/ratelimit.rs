//! Sliding-window rate limiting for outgoing email
//!
//! Gates every send against two independent time windows (hourly and daily)
//! so a runaway caller cannot burn the account's sending reputation. The
//! limiter is pure bookkeeping: no I/O, no errors, all decisions returned
//! as values.

use std::time::{Duration, Instant};

use rand::Rng;

/// Span of the hourly window
const HOURLY_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Span of the daily window
const DAILY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Bounds (in seconds, inclusive) for the suggested delay between
/// consecutive sends in a batch
const MIN_INTER_SEND_SECS: u64 = 3;
const MAX_INTER_SEND_SECS: u64 = 8;

/// Configured send limits, set once at startup and immutable thereafter.
///
/// Validation (both values positive) is the config loader's job; a limiter
/// built with a zero limit simply denies everything rather than panicking.
#[derive(Debug, Clone, Copy)]
pub struct SendLimits {
    /// Maximum sends in any sliding 1-hour window
    pub max_per_hour: u32,

    /// Maximum sends in any sliding 24-hour window
    pub max_per_day: u32,
}

/// Outcome of an admission check
#[derive(Debug, Clone)]
pub struct Admission {
    /// Whether a send may happen now
    pub allowed: bool,

    /// Human-readable denial reason, present only when not allowed
    pub reason: Option<String>,

    /// Sends left in the hourly window
    pub hourly_remaining: u32,

    /// Sends left in the daily window
    pub daily_remaining: u32,
}

/// Point-in-time view of window consumption, for reporting
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot {
    pub hourly_count: u32,
    pub hourly_limit: u32,
    pub hourly_remaining: u32,
    pub daily_count: u32,
    pub daily_limit: u32,
    pub daily_remaining: u32,
}

/// Sliding-window send limiter.
///
/// Every successful send is timestamped into both windows; expired entries
/// are filtered out lazily the next time a window is inspected. State lives
/// only in memory and resets on process restart.
///
/// The limiter itself is not synchronized. Callers running concurrent sends
/// must serialize the whole "check, send, record" sequence (the tool layer
/// does this with a mutex held across the send) so two requests cannot both
/// claim the last remaining slot.
pub struct RateLimiter {
    limits: SendLimits,
    hourly: Vec<Instant>,
    daily: Vec<Instant>,
}

impl RateLimiter {
    /// Create a limiter with empty windows
    pub fn new(limits: SendLimits) -> Self {
        Self {
            limits,
            hourly: Vec::new(),
            daily: Vec::new(),
        }
    }

    /// Check whether a send may happen right now.
    ///
    /// Pure read apart from dropping expired entries; calling it repeatedly
    /// never consumes capacity. The hourly window is checked before the
    /// daily one, so when both are exhausted the hourly reason wins.
    pub fn check_admission(&mut self) -> Admission {
        self.check_admission_at(Instant::now())
    }

    /// Record one successful send into both windows.
    ///
    /// Call this only after the send was confirmed successful, and exactly
    /// once per send: every call consumes a slot.
    pub fn record_success(&mut self) {
        self.record_success_at(Instant::now());
    }

    /// Current consumption and remaining capacity of both windows
    pub fn status(&mut self) -> UsageSnapshot {
        self.status_at(Instant::now())
    }

    /// How many of `requested` sends current capacity allows.
    ///
    /// Returns 0 when admission is denied outright, otherwise the requested
    /// count clamped to the tighter of the two windows. Lets a bulk caller
    /// trim its batch up front instead of hitting the limit mid-run.
    pub fn max_admissible_batch(&mut self, requested: usize) -> usize {
        self.max_admissible_batch_at(requested, Instant::now())
    }

    /// Suggested pause between consecutive sends in a batch, drawn uniformly
    /// from a fixed range. A cooperative pacing hint only; it plays no part
    /// in window accounting.
    pub fn suggested_inter_send_delay(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(MIN_INTER_SEND_SECS..=MAX_INTER_SEND_SECS);
        Duration::from_secs(secs)
    }

    fn check_admission_at(&mut self, now: Instant) -> Admission {
        self.purge(now);

        let hourly_count = self.hourly.len() as u32;
        let daily_count = self.daily.len() as u32;
        let hourly_remaining = self.limits.max_per_hour.saturating_sub(hourly_count);
        let daily_remaining = self.limits.max_per_day.saturating_sub(daily_count);

        let reason = if hourly_count >= self.limits.max_per_hour {
            Some(format!(
                "Hourly limit reached ({}/hour). Please wait before sending more emails.",
                self.limits.max_per_hour
            ))
        } else if daily_count >= self.limits.max_per_day {
            Some(format!(
                "Daily limit reached ({}/day). Please wait before sending more emails.",
                self.limits.max_per_day
            ))
        } else {
            None
        };

        Admission {
            allowed: reason.is_none(),
            reason,
            hourly_remaining,
            daily_remaining,
        }
    }

    fn record_success_at(&mut self, now: Instant) {
        self.hourly.push(now);
        self.daily.push(now);
    }

    fn status_at(&mut self, now: Instant) -> UsageSnapshot {
        self.purge(now);

        let hourly_count = self.hourly.len() as u32;
        let daily_count = self.daily.len() as u32;

        UsageSnapshot {
            hourly_count,
            hourly_limit: self.limits.max_per_hour,
            hourly_remaining: self.limits.max_per_hour.saturating_sub(hourly_count),
            daily_count,
            daily_limit: self.limits.max_per_day,
            daily_remaining: self.limits.max_per_day.saturating_sub(daily_count),
        }
    }

    fn max_admissible_batch_at(&mut self, requested: usize, now: Instant) -> usize {
        let admission = self.check_admission_at(now);
        if !admission.allowed {
            return 0;
        }
        requested
            .min(admission.hourly_remaining as usize)
            .min(admission.daily_remaining as usize)
    }

    /// Drop entries that have aged out of their window. An entry is counted
    /// while `now - timestamp < window`, so it expires exactly at the
    /// window boundary.
    fn purge(&mut self, now: Instant) {
        self.hourly
            .retain(|&sent| now.duration_since(sent) < HOURLY_WINDOW);
        self.daily
            .retain(|&sent| now.duration_since(sent) < DAILY_WINDOW);
    }
}
