/// Consecutive-failure bookkeeping for crash recovery.
///
/// Only touched under the lifecycle mutex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartState {
    pub count: u32,
    pub max_attempts: u32,
    pub monitoring_active: bool,
}

impl RestartState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            count: 0,
            max_attempts,
            monitoring_active: false,
        }
    }

    /// Record one more restart attempt. Returns the attempt number, or None
    /// once the budget is spent (the counter is reset in that case).
    pub fn next_attempt(&mut self) -> Option<u32> {
        self.count += 1;
        if self.count > self.max_attempts {
            self.count = 0;
            None
        } else {
            Some(self.count)
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
