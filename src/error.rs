use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("PNG decode error: {0}")]
    PngDecode(String),

    #[error("PNG encode error: {0}")]
    PngEncode(String),

    #[error("Unsupported PNG layout: {0}")]
    UnsupportedLayout(String),

    #[error("Image too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<png::DecodingError> for ImageError {
    fn from(e: png::DecodingError) -> Self {
        ImageError::PngDecode(e.to_string())
    }
}

impl From<png::EncodingError> for ImageError {
    fn from(e: png::EncodingError) -> Self {
        ImageError::PngEncode(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Codec error: {0}")]
    Codec(#[from] texkit_codec::Error),

    #[error("Invalid swizzle '{0}' (expected linear, morton, tiled:WxH or morton-tiled:N)")]
    InvalidSwizzle(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<texkit_codec::RegistryError> for ServiceError {
    fn from(e: texkit_codec::RegistryError) -> Self {
        ServiceError::Codec(e.into())
    }
}

impl From<texkit_codec::DitherError> for ServiceError {
    fn from(e: texkit_codec::DitherError) -> Self {
        ServiceError::Codec(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texkit_codec::{FormatKind, RegistryError};

    #[test]
    fn test_image_error_too_large() {
        let error = ImageError::TooLarge {
            width: 70000,
            height: 2,
        };
        assert_eq!(error.to_string(), "Image too large: 70000x2");
    }

    #[test]
    fn test_image_error_unsupported_layout() {
        let error = ImageError::UnsupportedLayout("16-bit grayscale".to_string());
        assert_eq!(error.to_string(), "Unsupported PNG layout: 16-bit grayscale");
    }

    #[test]
    fn test_service_error_invalid_swizzle() {
        let error = ServiceError::InvalidSwizzle("zigzag".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid swizzle 'zigzag' (expected linear, morton, tiled:WxH or morton-tiled:N)"
        );
    }

    #[test]
    fn test_service_error_from_registry_error() {
        let error: ServiceError = RegistryError::UnsupportedFormat {
            key: "foo".to_string(),
            kind: FormatKind::Color,
        }
        .into();
        match error {
            ServiceError::Codec(texkit_codec::Error::Registry(_)) => {}
            other => panic!("Expected Codec(Registry) variant, got {other:?}"),
        }
    }

    #[test]
    fn test_service_error_from_image_error() {
        let error: ServiceError = ImageError::PngDecode("bad header".to_string()).into();
        assert_eq!(error.to_string(), "Image error: PNG decode error: bad header");
    }
}
