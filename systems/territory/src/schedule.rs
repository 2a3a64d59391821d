//! Debounced scheduling of territory recomputation.

/// Decides when a pending recomputation should run.
///
/// The first mark opens a window. The recomputation becomes due once no mark
/// arrived for `settle_ticks`, or `max_latency_ticks` after the window opened,
/// whichever comes first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecalcSchedule {
    settle_ticks: u64,
    max_latency_ticks: u64,
    requested_at: Option<u64>,
    last_marked: u64,
}

impl RecalcSchedule {
    /// Creates an idle schedule.
    #[must_use]
    pub const fn new(settle_ticks: u64, max_latency_ticks: u64) -> Self {
        Self {
            settle_ticks,
            max_latency_ticks,
            requested_at: None,
            last_marked: 0,
        }
    }

    /// Records a request made during `tick`.
    pub fn mark(&mut self, tick: u64) {
        if self.requested_at.is_none() {
            self.requested_at = Some(tick);
        }
        self.last_marked = tick;
    }

    /// Reports whether the pending request should run at `tick`.
    #[must_use]
    pub fn is_due(&self, tick: u64) -> bool {
        let Some(requested_at) = self.requested_at else {
            return false;
        };
        tick >= self.last_marked.saturating_add(self.settle_ticks)
            || tick >= requested_at.saturating_add(self.max_latency_ticks)
    }

    /// Tick at which the pending window opened, if any.
    #[must_use]
    pub const fn requested_at(&self) -> Option<u64> {
        self.requested_at
    }

    /// Closes the window after a recomputation ran.
    pub fn clear(&mut self) {
        self.requested_at = None;
    }
}
