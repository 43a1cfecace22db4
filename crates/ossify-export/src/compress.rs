//! Keyframe sparsification and rotation wraparound repair.

use ossify_core::{Animatable, Interpolation, SampleValue, EPSILON};

use crate::sampler::Sample;

/// Drop samples that do not change the interpolated result.
///
/// `setup` is the value the channel holds when it has no keys; `None` keeps
/// the first sample unconditionally. `window_start` is the time from which
/// the channel is exported. A first sample later than the window start is
/// kept whatever the sample count, so a second pass returns its input.
pub fn sparsify<T: SampleValue>(
    samples: &[Sample<T>],
    setup: Option<&T>,
    window_start: f64,
) -> Vec<Sample<T>> {
    let n = samples.len();
    let mut out = Vec::with_capacity(n);
    let Some(first) = samples.first() else {
        return out;
    };

    let keep_first = !first.interpolation.is_exact()
        || setup.map_or(true, |s| !first.value.same_as(s))
        || first.time > window_start + EPSILON
        || (n > 1 && !first.value.same_as(&samples[1].value));
    if keep_first {
        out.push(first.clone());
    }

    for k in 1..n.saturating_sub(1) {
        let (prev, cur, next) = (&samples[k - 1], &samples[k], &samples[k + 1]);
        if !cur.interpolation.is_exact()
            || !prev.value.same_as(&cur.value)
            || !cur.value.same_as(&next.value)
        {
            out.push(cur.clone());
        }
    }

    if n > 1 {
        let (before, last) = (&samples[n - 2], &samples[n - 1]);
        if !before.interpolation.is_exact() || !before.value.same_as(&last.value) {
            out.push(last.clone());
        }
    }
    out
}

/// Insert a midpoint into every linear gap of 180 degrees or more.
///
/// The consuming runtime interpolates angles along the shortest path, which
/// would reverse the direction of such a gap. Inserted samples are not
/// re-examined.
pub fn insert_rotation_midpoints(samples: Vec<Sample<f64>>) -> Vec<Sample<f64>> {
    let mut out: Vec<Sample<f64>> = Vec::with_capacity(samples.len());
    for sample in samples {
        if let Some(prev) = out.last() {
            if prev.interpolation == Interpolation::Linear
                && (sample.value - prev.value).abs() >= 180.0
            {
                let mid = Sample::new(
                    prev.time + (sample.time - prev.time) / 2.0,
                    prev.value + (sample.value - prev.value) / 2.0,
                    prev.interpolation,
                );
                out.push(mid);
            }
        }
        out.push(sample);
    }
    out
}

/// Evaluate a sample sequence the way the consuming runtime does: holding
/// before the first and after the last sample, stepped or linear between.
pub fn evaluate<T: Animatable>(samples: &[Sample<T>], t: f64) -> Option<T> {
    let first = samples.first()?;
    let last = samples.last()?;
    if t <= first.time {
        return Some(first.value.clone());
    }
    if t >= last.time {
        return Some(last.value.clone());
    }
    let k = samples.partition_point(|s| s.time <= t) - 1;
    let (a, b) = (&samples[k], &samples[k + 1]);
    match a.interpolation {
        Interpolation::Stepped => Some(a.value.clone()),
        _ => {
            let span = b.time - a.time;
            if span <= 0.0 {
                return Some(b.value.clone());
            }
            Some(a.value.lerp(&b.value, (t - a.time) / span))
        }
    }
}
