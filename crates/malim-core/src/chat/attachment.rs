//! Image attachments for style-assistant messages.
//!
//! Images travel as `data:<mime>;base64,<payload>` URLs. Only `image/*`
//! types are accepted and the decoded payload is capped at
//! [`MAX_IMAGE_BYTES`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use malim_types::chat::ImageAttachment;

pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("not a base64 data URL")]
    NotADataUrl,

    #[error("unsupported attachment type: {0}")]
    UnsupportedType(String),

    #[error("image too large: {bytes} bytes (max {max})", max = MAX_IMAGE_BYTES)]
    TooLarge { bytes: usize },

    #[error("invalid base64 payload")]
    InvalidEncoding,
}

/// Validate a `data:` URL and wrap it as an attachment.
pub fn parse_data_url(data_url: &str) -> Result<ImageAttachment, AttachmentError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(AttachmentError::NotADataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(AttachmentError::NotADataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(AttachmentError::NotADataUrl)?;
    check_mime(mime)?;

    // Base64 expands by 4/3; reject obviously oversized payloads before decoding.
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(AttachmentError::TooLarge {
            bytes: payload.len() / 4 * 3,
        });
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AttachmentError::InvalidEncoding)?;
    check_size(bytes.len())?;

    Ok(ImageAttachment {
        data_url: data_url.to_string(),
    })
}

/// Encode raw image bytes (e.g. read from a file) as an attachment.
pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<ImageAttachment, AttachmentError> {
    check_mime(mime)?;
    check_size(bytes.len())?;
    Ok(ImageAttachment {
        data_url: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
    })
}

/// Guess an image MIME type from a file extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn check_mime(mime: &str) -> Result<(), AttachmentError> {
    if mime.starts_with("image/") && mime.len() > "image/".len() {
        Ok(())
    } else {
        Err(AttachmentError::UnsupportedType(mime.to_string()))
    }
}

fn check_size(bytes: usize) -> Result<(), AttachmentError> {
    if bytes > MAX_IMAGE_BYTES {
        Err(AttachmentError::TooLarge { bytes })
    } else {
        Ok(())
    }
}
