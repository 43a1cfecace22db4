use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::EPSILON;

/// The exported time range of a scene (its work area), in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub duration: f64,
}

impl TimeWindow {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            start,
            duration: duration.max(0.0),
        }
    }

    /// End of the window (inclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether `t` lies after the window start, beyond numeric noise.
    pub fn is_after_start(&self, t: f64) -> bool {
        t > self.start + EPSILON
    }

    /// Whether `t` lies before the window end, beyond numeric noise.
    pub fn is_before_end(&self, t: f64) -> bool {
        t < self.end() - EPSILON
    }

    /// Number of whole frame steps that fit in the window at `fps`.
    pub fn frame_steps(&self, fps: f64) -> u64 {
        if fps <= 0.0 {
            return 0;
        }
        // Tolerate float noise so that e.g. 1s at 30fps yields exactly 30 steps.
        (self.duration * fps + 1e-6).floor() as u64
    }

    /// Frame times from start to end inclusive, one per frame step.
    pub fn frame_times(&self, fps: f64) -> impl Iterator<Item = f64> + Clone {
        let start = self.start;
        let steps = self.frame_steps(fps);
        (0..=steps).map(move |i| start + i as f64 / fps)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}s, {:.3}s]", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end() {
        let w = TimeWindow::new(1.0, 2.5);
        assert!((w.end() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_frame_times_inclusive() {
        let w = TimeWindow::new(0.0, 1.0);
        let times: Vec<f64> = w.frame_times(4.0).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_frame_steps_float_noise() {
        let w = TimeWindow::new(0.0, 0.1 * 3.0);
        assert_eq!(w.frame_steps(10.0), 3);
        assert_eq!(TimeWindow::new(0.0, 1.0).frame_steps(30.0), 30);
    }

    #[test]
    fn test_frame_times_restartable() {
        let w = TimeWindow::new(2.0, 0.5);
        let it = w.frame_times(2.0);
        assert_eq!(it.clone().count(), 2);
        assert_eq!(it.collect::<Vec<_>>(), vec![2.0, 2.5]);
    }

    #[test]
    fn test_window_bounds() {
        let w = TimeWindow::new(0.0, 2.0);
        assert!(!w.is_after_start(0.0));
        assert!(w.is_after_start(0.1));
        assert!(w.is_before_end(1.9));
        assert!(!w.is_before_end(2.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeWindow::new(0.0, 2.0).to_string(), "[0.000s, 2.000s]");
    }
}
