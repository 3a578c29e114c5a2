use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::{CompressorError, CompressorResult};

/// Target encoding for a compression task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    /// File extensions associated with this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::WebP => &["webp"],
        }
    }

    /// The primary extension for this format
    pub fn primary_extension(&self) -> &'static str {
        self.extensions()[0]
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = CompressorError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            _ => Err(CompressorError::format(format!(
                "unsupported image format: {ext}"
            ))),
        }
    }
}

/// Derives the target format from a path's extension.
///
/// This is an outer-layer concern: the engine itself only ever sees an
/// already-resolved [`ImageFormat`].
pub fn format_from_extension(path: &Path) -> CompressorResult<ImageFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            CompressorError::format(format!("file has no extension: {}", path.display()))
        })?;

    ImageFormat::from_str(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("webp".parse::<ImageFormat>().unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!("gif".parse::<ImageFormat>().is_err());
        assert!(format_from_extension(Path::new("photo.gif")).is_err());
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(format_from_extension(Path::new("photo")).is_err());
    }

    #[test]
    fn derives_format_from_path() {
        let format = format_from_extension(Path::new("dir/photo.JPG")).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(format.primary_extension(), "jpg");
    }
}
