/// Core error types for the Ossify exporter.
use std::path::PathBuf;

/// A specialized Result type for Ossify operations.
pub type OssifyResult<T> = Result<T, OssifyError>;

/// Top-level error type encompassing all Ossify subsystems.
#[derive(Debug, thiserror::Error)]
pub enum OssifyError {
    /// No scene selected, empty scene, unparsable frame rate.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid project: {0}")]
    InvalidProject(String),

    #[error("missing resource: {message} ({path:?})")]
    MissingResource { message: String, path: PathBuf },

    #[error("failed to render distorted attachments for layer '{layer}'")]
    Rasterization { layer: String },

    #[error("invalid output name '{name}': {reason}")]
    NamingIntegrity { name: String, reason: String },

    #[error("image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OssifyError {
    /// Create a missing-resource error.
    pub fn missing(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        OssifyError::MissingResource {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Whether this error stops the whole run rather than just the current scene.
    pub fn aborts_run(&self) -> bool {
        matches!(self, OssifyError::Configuration(_) | OssifyError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_display() {
        let err = OssifyError::missing("footage file not found", "/assets/arm.png");
        assert!(err.to_string().contains("footage file not found"));
        assert!(err.to_string().contains("arm.png"));
    }

    #[test]
    fn test_run_fatality() {
        assert!(OssifyError::Configuration("no scene".into()).aborts_run());
        assert!(OssifyError::Io(std::io::Error::other("disk full")).aborts_run());
        assert!(!OssifyError::Rasterization { layer: "fx".into() }.aborts_run());
        assert!(!OssifyError::NamingIntegrity {
            name: "a".into(),
            reason: "empty".into()
        }.aborts_run());
        assert!(!OssifyError::missing("mesh", "").aborts_run());
    }
}
