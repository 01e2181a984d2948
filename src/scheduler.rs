use rand::Rng;

use crate::config::ReturnWindow;
use crate::profile::PlayerProfile;
use crate::types::Timestamp;

/// Source of "now". Injected so scheduling is reproducible in tests.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(chrono::Utc::now().timestamp().max(0) as u64)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Computes when a trader delivers recovered gear.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnScheduler {
    /// Seconds; zero disables the override.
    pub override_seconds: u64,
}

impl ReturnScheduler {
    pub fn new(override_seconds: u64) -> Self {
        ReturnScheduler { override_seconds }
    }

    /// Delivery time for a return starting at `now`.
    ///
    /// With an override configured the return lands exactly `override_seconds`
    /// later and the profile bonus is not applied. Otherwise a uniform delay in
    /// `[min_hours, max_hours]` is drawn and shortened by the player's
    /// insurance return-time bonus.
    pub fn return_time(
        &self,
        profile: &PlayerProfile,
        window: ReturnWindow,
        now: Timestamp,
        rng: &mut impl Rng,
    ) -> Timestamp {
        if self.override_seconds > 0 {
            return now.offset(self.override_seconds);
        }

        let bonus = profile.return_time_bonus().map(f64::abs).unwrap_or(0.0);
        let factor = (1.0 - bonus / 100.0).clamp(0.0, 1.0);

        let lo = window.min_hours.min(window.max_hours).saturating_mul(Timestamp::SECONDS_PER_HOUR);
        let hi = window.min_hours.max(window.max_hours).saturating_mul(Timestamp::SECONDS_PER_HOUR);
        let delay = rng.random_range(lo..=hi);

        now.offset((delay as f64 * factor) as u64)
    }
}
