//! Screenshot payloads sent to vision providers.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;

/// Largest screenshot accepted, in bytes. Provider limits are around 5 MB
/// for base64-encoded images.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image formats accepted by the supported vision APIs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ImageMediaType {
    /// PNG.
    #[serde(rename = "image/png")]
    #[strum(serialize = "image/png")]
    Png,
    /// JPEG.
    #[serde(rename = "image/jpeg")]
    #[strum(serialize = "image/jpeg", serialize = "image/jpg")]
    Jpeg,
    /// WebP.
    #[serde(rename = "image/webp")]
    #[strum(serialize = "image/webp")]
    Webp,
    /// GIF.
    #[serde(rename = "image/gif")]
    #[strum(serialize = "image/gif")]
    Gif,
}

impl ImageMediaType {
    /// Detects the format from the file's magic bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"GIF8") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// A decoded screenshot ready to be sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    media_type: ImageMediaType,
}

impl ImageInput {
    /// Wraps raw image bytes, detecting the format from the content.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::InvalidImage`] if the bytes are empty, too large,
    /// or not a supported image format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AiError> {
        if bytes.is_empty() {
            return Err(AiError::InvalidImage {
                message: "image is empty".to_string(),
            });
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AiError::InvalidImage {
                message: format!(
                    "image is {} bytes, maximum is {MAX_IMAGE_BYTES}",
                    bytes.len()
                ),
            });
        }
        let media_type = ImageMediaType::sniff(&bytes).ok_or_else(|| AiError::InvalidImage {
            message: "unsupported image format (expected PNG, JPEG, WebP, or GIF)".to_string(),
        })?;
        Ok(Self { bytes, media_type })
    }

    /// Decodes a base64 payload or a `data:image/...;base64,` URL as
    /// produced by canvas `toDataURL()`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::InvalidImage`] if the payload is not valid base64
    /// or not a supported image.
    pub fn from_base64(encoded: &str) -> Result<Self, AiError> {
        let encoded = encoded.trim();
        let payload = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| AiError::InvalidImage {
                    message: "data URL has no payload".to_string(),
                })?;
                if !header.ends_with(";base64") {
                    return Err(AiError::InvalidImage {
                        message: "data URL must be base64 encoded".to_string(),
                    });
                }
                data
            }
            None => encoded,
        };

        let bytes = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| AiError::InvalidImage {
                message: format!("invalid base64: {e}"),
            })?;

        Self::from_bytes(bytes)
    }

    /// The raw image bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The detected image format.
    #[must_use]
    pub const fn media_type(&self) -> ImageMediaType {
        self.media_type
    }

    /// Base64 (standard alphabet, padded) encoding of the image.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URL form of the image.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest byte sequence that sniffs as PNG.
    pub const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(ImageMediaType::sniff(PNG_HEADER), Some(ImageMediaType::Png));
        assert_eq!(
            ImageMediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageMediaType::Jpeg)
        );
        assert_eq!(
            ImageMediaType::sniff(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(ImageMediaType::Webp)
        );
        assert_eq!(ImageMediaType::sniff(b"GIF89a"), Some(ImageMediaType::Gif));
        assert_eq!(ImageMediaType::sniff(b"%PDF-1.7"), None);
    }

    #[test]
    fn media_type_displays_as_mime() {
        assert_eq!(ImageMediaType::Jpeg.to_string(), "image/jpeg");
        assert_eq!(
            "image/jpg".parse::<ImageMediaType>().unwrap(),
            ImageMediaType::Jpeg
        );
    }

    #[test]
    fn decodes_data_url() {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let image = ImageInput::from_base64(&data_url).unwrap();
        assert_eq!(image.media_type(), ImageMediaType::Png);
        assert_eq!(image.bytes(), PNG_HEADER);
        assert_eq!(image.to_data_url(), data_url);
    }

    #[test]
    fn decodes_bare_base64() {
        let image = ImageInput::from_base64(&STANDARD.encode(PNG_HEADER)).unwrap();
        assert_eq!(image.to_base64(), STANDARD.encode(PNG_HEADER));
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            ImageInput::from_base64("not base64!!"),
            Err(AiError::InvalidImage { .. })
        ));
        assert!(matches!(
            ImageInput::from_base64("data:image/png,rawdata"),
            Err(AiError::InvalidImage { .. })
        ));
        assert!(matches!(
            ImageInput::from_bytes(Vec::new()),
            Err(AiError::InvalidImage { .. })
        ));
        assert!(matches!(
            ImageInput::from_bytes(b"plain text".to_vec()),
            Err(AiError::InvalidImage { .. })
        ));
    }
}
