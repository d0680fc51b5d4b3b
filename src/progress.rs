//! Progress reporting for long-running operations.
//!
//! Operations that walk many pages accept a callback and invoke it
//! synchronously, so all progress for one operation is delivered before the
//! operation returns and the next one can start.

use serde::Serialize;

/// A `done / total` progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Units of work completed so far.
    pub done: usize,
    /// Total units of work in the operation.
    pub total: usize,
}

impl Progress {
    /// Completion as a percentage in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total > 0 {
            (self.done as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_zero_total_is_zero() {
        let progress = Progress { done: 3, total: 0 };
        assert_eq!(progress.percent(), 0.0);
    }

    #[test]
    fn percent_scales_linearly() {
        let progress = Progress { done: 5, total: 20 };
        assert_eq!(progress.percent(), 25.0);
    }
}
