use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limit::SlidingWindowLimiter;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "window-gate")]
#[command(about = "HTTP gateway with per-client sliding-window rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "WINDOW_GATE_PORT", default_value_t = 8080)]
    pub port: u16,

    // Max requests per client per window
    #[arg(long, env = "WINDOW_GATE_RATE_LIMIT", default_value_t = 10)]
    pub rate_limit: u32,

    // Window length in milliseconds
    #[arg(long, env = "WINDOW_GATE_RATE_WINDOW_MS", default_value_t = 60_000)]
    pub rate_window_ms: u64,

    // How often expired client windows are swept, 0 disables the sweeper
    #[arg(long, env = "WINDOW_GATE_SWEEP_INTERVAL_MS", default_value_t = 60_000)]
    pub sweep_interval_ms: u64,

    // Identify clients by the first X-Forwarded-For entry (only behind a proxy you control)
    #[arg(long, env = "WINDOW_GATE_TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,
}

impl Args {
    pub fn build_limiter(&self) -> Result<SlidingWindowLimiter, ConfigError> {
        SlidingWindowLimiter::new(self.rate_limit, self.rate_window_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }
}
