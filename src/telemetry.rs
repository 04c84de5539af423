//! Tracing setup and diagnostic helpers for hosts embedding `livechart`.
//!
//! Subscriber installation stays explicit and opt-in: call
//! `init_default_tracing` or wire your own `tracing` subscriber.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Initializes a default `tracing` subscriber when the `telemetry` feature is enabled.
///
/// Returns `true` when initialization succeeds.
/// Returns `false` when the feature is disabled or a global subscriber was
/// already installed by the host application.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("livechart=info")),
            )
            .with_target(false)
            .with_thread_names(true)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}

#[derive(Debug, Default)]
struct WindowState {
    last_emitted: Option<Instant>,
    suppressed: u64,
}

/// Gate letting a recurring diagnostic through at most once per window.
///
/// Shared by reference across worker threads; callers pass the current
/// instant so tests can drive the clock.
#[derive(Debug)]
pub struct RateLimitedWarning {
    window: Duration,
    state: Mutex<WindowState>,
}

impl RateLimitedWarning {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(WindowState::default()),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the number of occurrences suppressed since the last emission
    /// when a warning may be emitted at `now`, `None` otherwise.
    pub fn check(&self, now: Instant) -> Option<u64> {
        let mut state = self.state.lock();
        let open = state
            .last_emitted
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);
        if open {
            state.last_emitted = Some(now);
            Some(std::mem::take(&mut state.suppressed))
        } else {
            state.suppressed += 1;
            None
        }
    }
}
