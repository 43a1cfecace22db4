use std::path::{Path, PathBuf};

use ossify_core::{OssifyError, OssifyResult};
use ossify_export::ports::frame_name;
use ossify_export::FootageExporter;
use ossify_ir::{Footage, FootageKind};

use crate::source;

/// Writes footage as PNG files: PNG sources are copied, other image files
/// transcoded, solids filled with their color.
///
/// A sequence is written as `<name>.png` (its first frame, which static
/// attachments reference) followed by `<name>_00000.png`, `<name>_00001.png`...
pub struct PngFootageExporter {
    base_dir: PathBuf,
}

impl PngFootageExporter {
    /// `base_dir` is the directory relative footage paths are resolved from,
    /// normally the one holding the project file.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn write_file(&self, src: &Path, dest: &Path) -> OssifyResult<()> {
        if source::is_png(src) {
            if !src.is_file() {
                return Err(OssifyError::missing("footage file not found", src));
            }
            std::fs::copy(src, dest)?;
            Ok(())
        } else {
            source::save_png(&source::open(src)?, dest)
        }
    }
}

impl FootageExporter for PngFootageExporter {
    fn export(&self, out_dir: &Path, footage: &Footage, name: &str) -> OssifyResult<()> {
        let dest = out_dir.join(format!("{name}.png"));
        match &footage.kind {
            FootageKind::File { path } => {
                self.write_file(&source::resolve(&self.base_dir, path), &dest)?;
            }
            FootageKind::Solid { .. } => {
                source::save_png(&source::load(&self.base_dir, footage)?, &dest)?;
            }
            FootageKind::Sequence { path } => {
                let frames = source::sequence_frames(&self.base_dir, path)?;
                for (i, frame) in (0u32..).zip(&frames) {
                    let frame_dest = out_dir.join(format!("{}.png", frame_name(name, i)));
                    self.write_file(frame, &frame_dest)?;
                    if i == 0 {
                        std::fs::copy(&frame_dest, &dest)?;
                    }
                }
                tracing::debug!(footage = %footage.id, frames = frames.len(), "exported sequence");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use ossify_core::Color;

    fn write_image(path: &Path, format: image::ImageFormat) {
        RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]))
            .save_with_format(path, format)
            .unwrap();
    }

    #[test]
    fn test_png_is_copied_verbatim() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&src.path().join("arm.png"), image::ImageFormat::Png);

        let exporter = PngFootageExporter::new(src.path());
        exporter
            .export(out.path(), &Footage::file("a", "arm.png", 2, 2), "arm")
            .unwrap();

        let original = std::fs::read(src.path().join("arm.png")).unwrap();
        let copied = std::fs::read(out.path().join("arm.png")).unwrap();
        assert_eq!(original, copied);
    }

    #[test]
    fn test_other_formats_are_transcoded() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&src.path().join("leg.bmp"), image::ImageFormat::Bmp);

        let exporter = PngFootageExporter::new(src.path());
        exporter
            .export(out.path(), &Footage::file("l", "leg.bmp", 2, 2), "leg")
            .unwrap();

        let written = image::open(out.path().join("leg.png")).unwrap().to_rgba8();
        assert_eq!(written.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_solid_is_filled() {
        let out = tempfile::tempdir().unwrap();
        let exporter = PngFootageExporter::new(".");
        let footage = Footage::solid("bg", Color::rgb(0.0, 0.0, 1.0), 4, 3);
        exporter.export(out.path(), &footage, "bg").unwrap();

        let written = image::open(out.path().join("bg.png")).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (4, 3));
        assert_eq!(written.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_sequence_frames_are_numbered() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for n in 1..=3 {
            write_image(&src.path().join(format!("walk{n:04}.png")), image::ImageFormat::Png);
        }
        let footage = Footage {
            kind: FootageKind::Sequence {
                path: PathBuf::from("walk[0001-0003].png"),
            },
            ..Footage::file("w", "", 2, 2)
        };

        PngFootageExporter::new(src.path())
            .export(out.path(), &footage, "walk")
            .unwrap();
        for name in ["walk.png", "walk_00000.png", "walk_00001.png", "walk_00002.png"] {
            assert!(out.path().join(name).is_file(), "{name} missing");
        }
    }

    #[test]
    fn test_missing_source_is_reported() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = PngFootageExporter::new(src.path())
            .export(out.path(), &Footage::file("a", "gone.png", 2, 2), "gone")
            .unwrap_err();
        assert!(matches!(err, OssifyError::MissingResource { .. }));
        assert!(!out.path().join("gone.png").exists());
    }
}
