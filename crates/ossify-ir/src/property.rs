use serde::{Deserialize, Serialize};

use ossify_core::{Animatable, BezierEase, Interpolation};

/// A keyframe: a value at a specific time, in the owning scene's time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    pub time: f64,
    pub value: T,
    /// Interpolation of the segment leaving this keyframe.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Interpolation of the segment arriving at this keyframe, when the host
    /// distinguishes it from the previous key's outgoing one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_interpolation: Option<Interpolation>,
    /// Temporal ease of an outgoing bezier segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<BezierEase>,
}

impl<T> Keyframe<T> {
    pub fn new(time: f64, value: T) -> Self {
        Self {
            time,
            value,
            interpolation: Interpolation::Linear,
            in_interpolation: None,
            ease: None,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_in_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.in_interpolation = Some(interpolation);
        self
    }

    pub fn with_ease(mut self, ease: BezierEase) -> Self {
        self.interpolation = Interpolation::Bezier;
        self.ease = Some(ease);
        self
    }
}

/// An animatable channel: a constant value or time-ordered keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property<T> {
    Constant(T),
    Keyed(Vec<Keyframe<T>>),
}

impl<T: Default> Default for Property<T> {
    fn default() -> Self {
        Property::Constant(T::default())
    }
}

impl<T> Property<T> {
    pub fn constant(value: T) -> Self {
        Property::Constant(value)
    }

    pub fn keyed(keys: Vec<Keyframe<T>>) -> Self {
        Property::Keyed(keys)
    }

    /// Native keyframes; empty for a constant.
    pub fn keys(&self) -> &[Keyframe<T>] {
        match self {
            Property::Constant(_) => &[],
            Property::Keyed(keys) => keys,
        }
    }

    pub fn is_animated(&self) -> bool {
        !self.keys().is_empty()
    }

    pub fn key_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.keys().iter().map(|k| k.time)
    }

    /// Interpolation of the segment between key `k` and key `k + 1`.
    ///
    /// A curved or unknown interpolation on either end wins over stepped and
    /// linear. The last key reports its own outgoing interpolation.
    pub fn segment_interpolation(&self, k: usize) -> Interpolation {
        let keys = self.keys();
        let Some(key) = keys.get(k) else {
            return Interpolation::Stepped;
        };
        let out = key.interpolation;
        let Some(next) = keys.get(k + 1) else {
            return out;
        };
        let arriving = next.in_interpolation.unwrap_or(out);
        match (out, arriving) {
            (Interpolation::Unsupported, _) | (_, Interpolation::Unsupported) => {
                Interpolation::Unsupported
            }
            (Interpolation::Bezier, _) | (_, Interpolation::Bezier) => Interpolation::Bezier,
            (Interpolation::Stepped, _) => Interpolation::Stepped,
            (Interpolation::Linear, _) => Interpolation::Linear,
        }
    }

    /// Whether every segment is stepped or linear.
    pub fn is_exact(&self) -> bool {
        let n = self.keys().len();
        (0..n.saturating_sub(1)).all(|k| self.segment_interpolation(k).is_exact())
    }

    /// Interpolation in effect at time `t`. Constants count as stepped.
    pub fn interpolation_at(&self, t: f64) -> Interpolation {
        let keys = self.keys();
        if keys.is_empty() {
            return Interpolation::Stepped;
        }
        let k = keys.partition_point(|key| key.time <= t).saturating_sub(1);
        self.segment_interpolation(k)
    }

    /// Map key times into an enclosing scope: `t' = offset + factor * t`.
    pub fn remap_time(&self, offset: f64, factor: f64) -> Self
    where
        T: Clone,
    {
        match self {
            Property::Constant(v) => Property::Constant(v.clone()),
            Property::Keyed(keys) => Property::Keyed(
                keys.iter()
                    .map(|k| Keyframe {
                        time: offset + factor * k.time,
                        ..k.clone()
                    })
                    .collect(),
            ),
        }
    }
}

impl<T: Animatable + Default> Property<T> {
    /// Evaluate the property at time `t`.
    ///
    /// Holds the first value before the first key and the last value after
    /// the last key. An empty key list evaluates to `T::default()`.
    pub fn value_at(&self, t: f64) -> T {
        let keys = match self {
            Property::Constant(v) => return v.clone(),
            Property::Keyed(keys) => keys,
        };
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return T::default();
        };
        if t <= first.time {
            return first.value.clone();
        }
        if t >= last.time {
            return last.value.clone();
        }

        let k = keys.partition_point(|key| key.time <= t) - 1;
        let (a, b) = (&keys[k], &keys[k + 1]);
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value.clone();
        }
        let u = (t - a.time) / span;
        match self.segment_interpolation(k) {
            Interpolation::Stepped => a.value.clone(),
            Interpolation::Linear => a.value.lerp(&b.value, u),
            Interpolation::Bezier | Interpolation::Unsupported => {
                let eased = a.ease.unwrap_or(BezierEase::EASY).apply(u);
                a.value.lerp(&b.value, eased)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossify_core::Point2D;

    fn linear_ramp() -> Property<f64> {
        Property::keyed(vec![Keyframe::new(1.0, 0.0), Keyframe::new(3.0, 100.0)])
    }

    #[test]
    fn test_constant_evaluates_everywhere() {
        let p = Property::constant(42.0);
        assert_eq!(p.value_at(-5.0), 42.0);
        assert_eq!(p.value_at(1e6), 42.0);
        assert!(!p.is_animated());
    }

    #[test]
    fn test_linear_evaluation_and_clamping() {
        let p = linear_ramp();
        assert_eq!(p.value_at(0.0), 0.0);
        assert_eq!(p.value_at(2.0), 50.0);
        assert_eq!(p.value_at(3.0), 100.0);
        assert_eq!(p.value_at(10.0), 100.0);
    }

    #[test]
    fn test_stepped_holds() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 1.0).with_interpolation(Interpolation::Stepped),
            Keyframe::new(1.0, 5.0),
        ]);
        assert_eq!(p.value_at(0.99), 1.0);
        assert_eq!(p.value_at(1.0), 5.0);
        assert!(p.is_exact());
    }

    #[test]
    fn test_bezier_is_not_exact() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 0.0).with_ease(BezierEase::EASY),
            Keyframe::new(1.0, 10.0),
        ]);
        assert!(!p.is_exact());
        assert!(p.value_at(0.25) < 2.5);
    }

    #[test]
    fn test_arriving_interpolation_counts() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.0, 10.0).with_in_interpolation(Interpolation::Bezier),
        ]);
        assert_eq!(p.segment_interpolation(0), Interpolation::Bezier);
        assert!(!p.is_exact());
    }

    #[test]
    fn test_point_property() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, Point2D::new(0.0, 0.0)),
            Keyframe::new(2.0, Point2D::new(10.0, -20.0)),
        ]);
        assert_eq!(p.value_at(1.0), Point2D::new(5.0, -10.0));
    }

    #[test]
    fn test_remap_time() {
        let p = linear_ramp().remap_time(10.0, 0.5);
        let times: Vec<f64> = p.key_times().collect();
        assert_eq!(times, vec![10.5, 11.5]);
        assert_eq!(p.value_at(11.0), 50.0);
    }

    #[test]
    fn test_interpolation_at() {
        let p = Property::keyed(vec![
            Keyframe::new(0.0, 0.0).with_interpolation(Interpolation::Stepped),
            Keyframe::new(1.0, 1.0),
            Keyframe::new(2.0, 2.0),
        ]);
        assert_eq!(p.interpolation_at(0.5), Interpolation::Stepped);
        assert_eq!(p.interpolation_at(1.5), Interpolation::Linear);
        assert_eq!(Property::constant(1.0).interpolation_at(0.0), Interpolation::Stepped);
    }

    #[test]
    fn test_deserialize_shapes() {
        let c: Property<f64> = serde_json::from_str("100").unwrap();
        assert_eq!(c, Property::constant(100.0));
        let k: Property<f64> =
            serde_json::from_str(r#"[{"time":0,"value":1,"interpolation":"hold"},{"time":1,"value":2}]"#)
                .unwrap();
        assert_eq!(k.keys().len(), 2);
        assert_eq!(k.keys()[0].interpolation, Interpolation::Stepped);
        let p: Property<Point2D> = serde_json::from_str(r#"{"x":1,"y":2}"#).unwrap();
        assert_eq!(p.value_at(0.0), Point2D::new(1.0, 2.0));
    }
}
