//! # ossify-raster
//!
//! Image collaborators for the exporter, built on the `image` crate.
//! [`PngFootageExporter`] writes every used footage item as PNG next to the
//! exported documents; [`StillFrameRasterizer`] stands in for a real
//! renderer and writes the undistorted image for every frame.

pub mod footage;
pub mod source;
pub mod still;

pub use footage::PngFootageExporter;
pub use still::StillFrameRasterizer;
