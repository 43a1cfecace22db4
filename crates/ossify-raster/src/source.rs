//! Locating and decoding footage pixels.

use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use ossify_core::{OssifyError, OssifyResult};
use ossify_ir::{Footage, FootageKind, SequencePattern};

/// Resolve a footage path against the project directory.
pub fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Whether a path names a PNG file, judged by its extension.
pub fn is_png(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// The files of a numbered image sequence, in frame order.
pub fn sequence_frames(base_dir: &Path, path: &Path) -> OssifyResult<Vec<PathBuf>> {
    let pattern = path
        .file_name()
        .and_then(|n| SequencePattern::parse(&n.to_string_lossy()))
        .ok_or_else(|| OssifyError::missing("not a numbered image sequence", path))?;
    let dir = resolve(base_dir, path.parent().unwrap_or_else(|| Path::new("")));
    Ok(pattern
        .frames()
        .map(|n| dir.join(pattern.frame_file_name(n, pattern.width)))
        .collect())
}

/// Decode an image file into RGBA pixels.
pub fn open(path: &Path) -> OssifyResult<RgbaImage> {
    if !path.is_file() {
        return Err(OssifyError::missing("footage file not found", path));
    }
    let image = image::open(path)
        .map_err(|e| OssifyError::Image(format!("failed to decode {}: {}", path.display(), e)))?;
    Ok(image.to_rgba8())
}

/// The still image a footage item shows. Sequences show their first frame.
pub fn load(base_dir: &Path, footage: &Footage) -> OssifyResult<RgbaImage> {
    match &footage.kind {
        FootageKind::File { path } => open(&resolve(base_dir, path)),
        FootageKind::Solid { color } => Ok(RgbaImage::from_pixel(
            footage.width.max(1),
            footage.height.max(1),
            Rgba(color.to_rgba8()),
        )),
        FootageKind::Sequence { path } => {
            let frames = sequence_frames(base_dir, path)?;
            let first = frames
                .first()
                .ok_or_else(|| OssifyError::missing("empty image sequence", path))?;
            open(first)
        }
    }
}

pub fn save_png(image: &RgbaImage, path: &Path) -> OssifyResult<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| OssifyError::Image(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossify_core::Color;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Path::new("/projects/robot");
        assert_eq!(resolve(base, Path::new("img/arm.png")), base.join("img/arm.png"));
        assert_eq!(resolve(base, Path::new("/abs/arm.png")), PathBuf::from("/abs/arm.png"));
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(Path::new("arm.PNG")));
        assert!(!is_png(Path::new("arm.jpg")));
        assert!(!is_png(Path::new("arm")));
    }

    #[test]
    fn test_sequence_frames() {
        let frames = sequence_frames(Path::new("/p"), Path::new("walk/step[08-10].png")).unwrap();
        assert_eq!(
            frames,
            vec![
                PathBuf::from("/p/walk/step08.png"),
                PathBuf::from("/p/walk/step09.png"),
                PathBuf::from("/p/walk/step10.png"),
            ]
        );
    }

    #[test]
    fn test_solid_fills_footage_size() {
        let footage = Footage::solid("bg", Color::rgb(1.0, 0.0, 0.0), 3, 2);
        let image = load(Path::new("."), &footage).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_missing_file() {
        let footage = Footage::file("arm", "does/not/exist.png", 4, 4);
        let err = load(Path::new("/nonexistent"), &footage).unwrap_err();
        assert!(matches!(err, OssifyError::MissingResource { .. }));
    }
}
