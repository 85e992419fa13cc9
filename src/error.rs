use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Everything that can go wrong while capturing a document image.
///
/// The first three variants are user-correctable input problems; the rest
/// wrap decoder, encoder and filesystem failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{name} is not a JPEG or PNG image (got {mime})")]
    InvalidFileType { name: String, mime: String },

    #[error("{name} is too large ({size}), please choose a file under {limit}")]
    FileTooLarge {
        name: String,
        size: String,
        limit: String,
    },

    #[error("cannot allocate a {width}x{height} drawing surface")]
    DrawingSurfaceUnavailable { width: u32, height: u32 },

    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode cropped image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl CaptureError {
    /// Short title for the message dialog.
    pub fn title(&self) -> &'static str {
        match self {
            CaptureError::InvalidFileType { .. } => "Unsupported file type",
            CaptureError::FileTooLarge { .. } => "File too large",
            CaptureError::DrawingSurfaceUnavailable { .. } => "Crop failed",
            CaptureError::Decode { .. } => "Cannot read image",
            CaptureError::Encode(_) => "Crop failed",
            CaptureError::Io { .. } => "File error",
            CaptureError::Config { .. } => "Settings error",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::Io {
            path: path.into(),
            source,
        }
    }
}
