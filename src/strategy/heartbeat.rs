use chrono::{DateTime, Duration, Utc};

/// Rate limiter for the periodic status log line
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last_beat: Option<DateTime<Utc>>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_beat: None,
        }
    }

    /// Due on the first call and whenever `interval` has elapsed since the last beat
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_beat {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Record a beat at `now`. Order submissions also call this so the next
    /// status line comes a full interval later.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_beat = Some(now);
    }

    /// Returns true and records the beat if one is due
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_due(now) {
            self.touch(now);
            true
        } else {
            false
        }
    }

    pub fn last_beat(&self) -> Option<DateTime<Utc>> {
        self.last_beat
    }
}
