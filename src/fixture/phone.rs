use std::time::{SystemTime, UNIX_EPOCH};

/// Collision-resistant test phone numbers.
///
/// Numbers look like `+1555{ts5}{counter:02}00` where `ts5` is the last five
/// digits of the unix timestamp the generator was seeded with. Each
/// generator owns its counter, so parallel runs with distinct seeds never
/// share state.
#[derive(Debug, Clone)]
pub struct PhoneGenerator {
    stamp: String,
    counter: u32,
}

impl PhoneGenerator {
    /// Seeded from the current wall clock, counter starting at zero
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::with_seed(secs, 0)
    }

    pub fn with_seed(timestamp: u64, counter: u32) -> Self {
        Self {
            stamp: format!("{:05}", timestamp % 100_000),
            counter,
        }
    }

    /// Next unused number
    pub fn next_phone(&mut self) -> String {
        self.counter += 1;
        format!("+1555{}{:02}00", self.stamp, self.counter)
    }
}

impl Default for PhoneGenerator {
    fn default() -> Self {
        Self::new()
    }
}
