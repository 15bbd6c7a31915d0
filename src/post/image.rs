//! Decoding of inline image payloads.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// A decoded image ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Decodes a base64 image, optionally wrapped in a `data:` URL.
///
/// Bare base64 is assumed to be PNG.
pub(crate) fn decode_image(data: &str) -> Result<DecodedImage> {
    let data = data.trim();
    let (mime, encoded) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, encoded) = rest
                .split_once(',')
                .ok_or_else(|| Error::validation("image data URL has no payload"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| Error::validation("image data URL must be base64-encoded"))?;
            (mime, encoded)
        },
        None => ("image/png", data),
    };

    let (content_type, extension) = image_type(mime)
        .ok_or_else(|| Error::validation(format!("unsupported image type: {mime}")))?;

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::validation("image data is empty"));
    }
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::validation(format!("image data is not valid base64: {e}")))?;

    Ok(DecodedImage {
        bytes,
        content_type,
        extension,
    })
}

fn image_type(mime: &str) -> Option<(&'static str, &'static str)> {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some(("image/png", "png")),
        "image/jpeg" | "image/jpg" => Some(("image/jpeg", "jpg")),
        "image/gif" => Some(("image/gif", "gif")),
        "image/webp" => Some(("image/webp", "webp")),
        _ => None,
    }
}

/// Key of the `n`-th image (1-based) of a post.
pub(crate) fn image_key(post_prefix: &str, n: usize, extension: &str) -> String {
    format!("{post_prefix}image-{n}.{extension}")
}
