//! # ossify-core
//!
//! Core types and primitives for the Ossify skeletal exporter.
//! This crate contains foundational types shared across all Ossify crates:
//! points, colors, interpolation kinds, time windows, configuration,
//! output number formatting and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod hash;
pub mod math;
pub mod number;
pub mod time;
pub mod types;
pub mod value;

pub use config::*;

pub use color::Color;
pub use error::{OssifyError, OssifyResult};
pub use hash::ContentHash;
pub use math::Point2D;
pub use number::Num;
pub use time::TimeWindow;
pub use types::{BezierEase, Interpolation};
pub use value::{Animatable, SampleValue, EPSILON};
