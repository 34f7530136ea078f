//! Run statistics.
//!
//! [`RunStats`] counts the ticks advanced by a [`Simulation`](crate::Simulation)
//! and the simulated time they covered.

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    /// Engine ticks advanced.
    pub ticks: u64,
    /// Simulated seconds across those ticks.
    pub simulated_seconds: f64,
}

impl RunStats {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            simulated_seconds: 0.0,
        }
    }

    /// Account for one tick of `dt` seconds.
    pub fn record(&mut self, dt: f64) {
        self.ticks += 1;
        self.simulated_seconds += dt;
    }

    /// Mean simulated seconds per tick.
    pub fn mean_tick_seconds(&self) -> Option<f64> {
        if self.ticks == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.simulated_seconds / self.ticks as f64)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
