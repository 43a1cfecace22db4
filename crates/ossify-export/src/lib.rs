//! # ossify-export
//!
//! Turns a validated project into skeletal animation documents. Nested scenes
//! are flattened, layers become bones and slots, and every animated property
//! is sampled, sparsified and written relative to the setup pose.
//! Rasterization and footage copying happen behind the [`Rasterizer`] and
//! [`FootageExporter`] ports.

pub mod assemble;
pub mod attachment;
pub mod compress;
pub mod exporter;
pub mod flatten;
pub mod hierarchy;
pub mod naming;
pub mod ports;
pub mod sampler;
pub mod writer;

pub use assemble::{AnimationAssembler, Assembly};
pub use compress::{insert_rotation_midpoints, sparsify};
pub use exporter::{default_output_dir, ExportReport, Exporter, SceneReport};
pub use flatten::{FlatLayer, FlatScene, SceneFlattener};
pub use hierarchy::{map_bones, Bone};
pub use ports::{FootageExporter, Rasterizer, RenderRequest};
pub use sampler::{CurveSampler, Sample, SampleMode};
pub use writer::SkeletonDocument;
