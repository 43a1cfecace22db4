//! Extraction of `(time, value, interpolation)` samples from animatable properties.

use ossify_core::{Animatable, Interpolation, TimeWindow};
use ossify_ir::Property;

/// One exported sample of a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub time: f64,
    pub value: T,
    /// Interpolation of the segment leaving this sample.
    pub interpolation: Interpolation,
}

impl<T> Sample<T> {
    pub fn new(time: f64, value: T, interpolation: Interpolation) -> Self {
        Self {
            time,
            value,
            interpolation,
        }
    }

    pub fn linear(time: f64, value: T) -> Self {
        Self::new(time, value, Interpolation::Linear)
    }

    pub fn stepped(time: f64, value: T) -> Self {
        Self::new(time, value, Interpolation::Stepped)
    }

    /// Convert the value, keeping time and interpolation.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sample<U> {
        Sample {
            time: self.time,
            value: f(self.value),
            interpolation: self.interpolation,
        }
    }
}

/// How a property is turned into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// One sample per native keyframe.
    Exact,
    /// One sample per frame step across the window, all linear.
    FixedRate,
}

/// Samples properties over a scene's window at a given frame rate.
#[derive(Debug, Clone, Copy)]
pub struct CurveSampler {
    window: TimeWindow,
    fps: f64,
    force_fixed_rate: bool,
}

impl CurveSampler {
    pub fn new(window: TimeWindow, fps: f64, force_fixed_rate: bool) -> Self {
        Self {
            window,
            fps,
            force_fixed_rate,
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn forces_fixed_rate(&self) -> bool {
        self.force_fixed_rate
    }

    /// Pick the mode for one property.
    ///
    /// Exact mode falls back to fixed-rate as soon as one segment is neither
    /// stepped nor linear.
    pub fn mode_for<T>(&self, property: &Property<T>) -> SampleMode {
        if self.force_fixed_rate {
            return SampleMode::FixedRate;
        }
        let segments = property.keys().len().saturating_sub(1);
        for k in 0..segments {
            match property.segment_interpolation(k) {
                Interpolation::Stepped | Interpolation::Linear => {}
                Interpolation::Bezier => {
                    tracing::debug!(segment = k, "curved segment, sampling at fixed rate");
                    return SampleMode::FixedRate;
                }
                Interpolation::Unsupported => {
                    tracing::warn!(
                        segment = k,
                        "unsupported interpolation, sampling at fixed rate instead"
                    );
                    return SampleMode::FixedRate;
                }
            }
        }
        SampleMode::Exact
    }

    /// A restartable sequence of samples for `property`.
    pub fn sample<'a, T>(&self, property: &'a Property<T>) -> Samples<'a, T>
    where
        T: Animatable + Default,
    {
        let mode = self.mode_for(property);
        let len = match mode {
            SampleMode::Exact => property.keys().len() as u64,
            SampleMode::FixedRate => self.window.frame_steps(self.fps) + 1,
        };
        Samples {
            property,
            mode,
            window: self.window,
            fps: self.fps,
            next: 0,
            len,
        }
    }
}

/// Iterator over the samples of one property. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Samples<'a, T> {
    property: &'a Property<T>,
    mode: SampleMode,
    window: TimeWindow,
    fps: f64,
    next: u64,
    len: u64,
}

impl<T> Samples<'_, T> {
    pub fn mode(&self) -> SampleMode {
        self.mode
    }
}

impl<T: Animatable + Default> Iterator for Samples<'_, T> {
    type Item = Sample<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let i = self.next;
        self.next += 1;
        match self.mode {
            SampleMode::Exact => {
                let k = i as usize;
                let key = self.property.keys().get(k)?;
                let interpolation = match self.property.segment_interpolation(k) {
                    exact if exact.is_exact() => exact,
                    _ => Interpolation::Linear,
                };
                Some(Sample::new(key.time, key.value.clone(), interpolation))
            }
            SampleMode::FixedRate => {
                let time = self.window.start + i as f64 / self.fps;
                Some(Sample::linear(time, self.property.value_at(time)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl<T: Animatable + Default> ExactSizeIterator for Samples<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ossify_core::BezierEase;
    use ossify_ir::Keyframe;

    fn sampler(fixed: bool) -> CurveSampler {
        CurveSampler::new(TimeWindow::new(0.0, 1.0), 4.0, fixed)
    }

    #[test]
    fn test_exact_mode_one_sample_per_key() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 1.0).with_interpolation(Interpolation::Stepped),
            Keyframe::new(0.5, 2.0),
            Keyframe::new(1.0, 3.0),
        ]);
        let samples: Vec<_> = sampler(false).sample(&p).collect();
        assert_eq!(
            samples,
            vec![
                Sample::stepped(0.0, 1.0),
                Sample::linear(0.5, 2.0),
                Sample::linear(1.0, 3.0),
            ]
        );
    }

    #[test]
    fn test_constant_has_no_exact_samples() {
        let p = Property::constant(5.0);
        assert_eq!(sampler(false).sample(&p).count(), 0);
        assert_eq!(sampler(true).sample(&p).count(), 5);
    }

    #[test]
    fn test_fixed_rate_covers_window_inclusive() {
        let p = Property::keyed(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 100.0)]);
        let samples: Vec<_> = sampler(true).sample(&p).collect();
        let times: Vec<f64> = samples.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(samples
            .iter()
            .all(|s| s.interpolation == Interpolation::Linear));
        assert_eq!(samples[2].value, 50.0);
    }

    #[test]
    fn test_bezier_falls_back_to_fixed_rate() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 0.0).with_ease(BezierEase::EASY),
            Keyframe::new(1.0, 100.0),
        ]);
        let samples = sampler(false).sample(&p);
        assert_eq!(samples.mode(), SampleMode::FixedRate);
        assert_eq!(samples.len(), 5);
    }

    #[test]
    fn test_unsupported_falls_back_to_fixed_rate() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 0.0).with_interpolation(Interpolation::Unsupported),
            Keyframe::new(1.0, 100.0),
        ]);
        assert_eq!(sampler(false).mode_for(&p), SampleMode::FixedRate);
    }

    #[test]
    fn test_samples_restart() {
        let p = Property::keyed(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]);
        let mut samples = sampler(false).sample(&p);
        let fresh = samples.clone();
        samples.next();
        assert_eq!(samples.len(), 1);
        assert_eq!(fresh.count(), 2);
    }
}
