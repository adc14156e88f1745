use std::time::Duration;

/// Tunables for the tester. Defaults are the values the hardware ships with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesterConfig {
    /// Consecutive active samples before an encoder phase reads as high.
    pub encoder_debounce: u32,
    /// Polls a button must stay released after a press before it can fire again.
    pub button_quiet: u32,
    /// Quarter-steps of the encoder per reported detent.
    pub wheel_threshold: i8,
    /// Idle time between the refresh test's write and read passes.
    pub retention_delay: Duration,
    /// Wait after switching socket power on.
    pub power_settle: Duration,
    /// Seed the per-stream seeds are derived from.
    pub master_seed: u64,
    /// Frame period of the busy animation on the test screen.
    pub animation_period: Duration,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            encoder_debounce: 1000,
            button_quiet: 50_000,
            wheel_threshold: 4,
            retention_delay: Duration::from_micros(5000),
            power_settle: Duration::from_millis(100),
            master_seed: 42,
            animation_period: Duration::from_millis(100),
        }
    }
}
