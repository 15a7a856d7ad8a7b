use std::collections::HashMap;
use std::sync::Mutex;

use time::{Duration, OffsetDateTime};
use tracing::{error, warn};

#[derive(Debug)]
struct RateLimit {
    attempts: u32,
    first_attempt: OffsetDateTime,
}

/// Fixed-window limiter keyed by caller-supplied strings. Entries older
/// than two windows are swept on each check.
#[derive(Debug)]
pub struct RateLimiter {
    limits: Mutex<HashMap<String, RateLimit>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_minutes: i64) -> Self {
        Self {
            limits: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::minutes(window_minutes),
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> Result<(), String> {
        let now = OffsetDateTime::now_utc();

        let mut limits = match self.limits.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Failed to acquire rate limit lock: {}", e);
                return Err("Internal rate limit error".into());
            }
        };

        limits.retain(|_, limit| now - limit.first_attempt <= self.window * 2);

        let result = match limits.get_mut(key) {
            Some(limit) => {
                if now - limit.first_attempt <= self.window && limit.attempts >= self.max_attempts {
                    let minutes_to_wait = (limit.first_attempt + self.window - now).whole_minutes();
                    Err(format!(
                        "Rate limit exceeded. Please try again in {} minutes.",
                        minutes_to_wait.max(1)
                    ))
                } else if now - limit.first_attempt > self.window {
                    *limit = RateLimit { attempts: 1, first_attempt: now };
                    Ok(())
                } else {
                    limit.attempts += 1;
                    Ok(())
                }
            }
            None => {
                limits.insert(key.to_string(), RateLimit { attempts: 1, first_attempt: now });
                Ok(())
            }
        };

        if let Err(ref message) = result {
            warn!("Rate limit triggered for key {}: {}", key, message);
        }
        result
    }
}
