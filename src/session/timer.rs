/// Sleep timer: counts down whole seconds while armed and reports expiry once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepTimer {
    minutes: u32,
    remaining: u32,
    armed: bool,
    /// Fractional seconds not yet counted.
    carry: f64,
}

impl SleepTimer {
    pub fn new(minutes: u32) -> Self {
        let mut timer = Self::default();
        timer.set_minutes(minutes);
        timer
    }

    /// Choose a duration, resetting the countdown. 0 means no timer.
    pub fn set_minutes(&mut self, minutes: u32) {
        self.minutes = minutes;
        self.remaining = minutes.saturating_mul(60);
        self.carry = 0.0;
        if minutes == 0 {
            self.armed = false;
        }
    }

    /// Start counting down. An expired countdown starts over.
    pub fn arm(&mut self) {
        if self.minutes == 0 {
            return;
        }
        if self.remaining == 0 {
            self.remaining = self.minutes.saturating_mul(60);
        }
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.carry = 0.0;
    }

    /// Advance by `seconds`. Returns true exactly once, when the countdown
    /// reaches zero; the timer disarms itself.
    pub fn tick(&mut self, seconds: f64) -> bool {
        if !self.armed || !(seconds > 0.0) {
            return false;
        }
        self.carry += seconds;
        let whole = self.carry.floor();
        self.carry -= whole;
        let whole = whole.min(f64::from(u32::MAX)) as u32;
        self.remaining = self.remaining.saturating_sub(whole);
        if self.remaining == 0 {
            self.disarm();
            return true;
        }
        false
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// `MM:SS` of the remaining time, or `∞` when no timer is set.
    pub fn display(&self) -> String {
        if self.minutes == 0 {
            return "∞".to_string();
        }
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}
